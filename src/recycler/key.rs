//! 回收器缓存键
//!
//! 缓存键由 DAG 标识及其代数、设备以及缓存项相关的上下文组合哈希得到。
//! DAG 缓存清空后ID会被重新分配，代数保证清空前后的计划不会得到相同的键。
//! 空 DAG（计划不可缓存或 DAG 缓存溢出）不能生成缓存键。

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::core::device::DeviceIdentifier;
use crate::dag::ExtractedPlanDag;

/// 查询计划哈希
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryPlanHash(u64);

impl QueryPlanHash {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// 由 DAG、设备与附加上下文计算缓存键
    pub fn compute<T>(dag: &ExtractedPlanDag, device: DeviceIdentifier, context: &T) -> Option<Self>
    where
        T: Hash + ?Sized,
    {
        if !dag.is_cacheable() {
            return None;
        }
        let mut hasher = DefaultHasher::new();
        dag.generation.hash(&mut hasher);
        dag.extracted_dag.hash(&mut hasher);
        device.hash(&mut hasher);
        context.hash(&mut hasher);
        Some(Self(hasher.finish()))
    }

    /// 只由 DAG 与设备计算缓存键
    pub fn from_dag(dag: &ExtractedPlanDag, device: DeviceIdentifier) -> Option<Self> {
        Self::compute(dag, device, &())
    }
}

impl fmt::Display for QueryPlanHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
