//! 缓存项类型与可回收项特征

use serde::{Deserialize, Serialize};
use std::fmt;

use super::key::QueryPlanHash;
use crate::core::device::DeviceIdentifier;

/// 缓存项类型，每种类型拥有独立的容量预算
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheItemType {
    /// 完美哈希表
    PerfectHt,
    /// 基线哈希表
    BaselineHt,
    /// 重叠（范围）连接哈希表
    OverlapsHt,
}

impl CacheItemType {
    pub const ALL: [CacheItemType; 3] = [
        CacheItemType::PerfectHt,
        CacheItemType::BaselineHt,
        CacheItemType::OverlapsHt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheItemType::PerfectHt => "PERFECT_HT",
            CacheItemType::BaselineHt => "BASELINE_HT",
            CacheItemType::OverlapsHt => "OVERLAPS_HT",
        }
    }
}

impl fmt::Display for CacheItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 可回收项特征
///
/// 回收器对缓存内容的要求：知道自己的类型、估算大小、缓存键与所在设备
pub trait RecyclableItem: Send + Sync + 'static {
    /// 缓存项类型
    fn item_type(&self) -> CacheItemType;

    /// 估算占用字节数
    fn estimate_size(&self) -> u64;

    /// 缓存键，计划不可缓存时为 None
    fn key_of(&self) -> Option<QueryPlanHash>;

    /// 所在设备
    fn device_of(&self) -> DeviceIdentifier;
}
