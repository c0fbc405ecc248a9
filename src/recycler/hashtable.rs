//! 连接哈希表缓存项
//!
//! 三种哈希表（完美、基线、重叠）以同一个枚举表示，实现 `RecyclableItem`
//! 后交给 `HashtableRecycler` 管理

use std::collections::BTreeMap;
use std::fmt;
use std::mem;

use super::item::{CacheItemType, RecyclableItem};
use super::item_cache::ItemCache;
use super::key::QueryPlanHash;
use crate::config::HashtableCacheConfig;
use crate::core::device::DeviceIdentifier;
use crate::dag::ExtractedPlanDag;

/// 空槽标记
pub const EMPTY_SLOT: i32 = -1;

/// 完美哈希表允许的最大键范围，超出时改用基线哈希表
pub const MAX_PERFECT_HASH_RANGE: usize = 1 << 27;

/// 连接哈希表回收器
pub type HashtableRecycler = ItemCache<JoinHashTable>;

impl ItemCache<JoinHashTable> {
    pub fn from_config(config: &HashtableCacheConfig) -> Self {
        Self::new("HashtableRecycler", config.budgets())
    }
}

/// 哈希表布局
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashTableLayout {
    /// 每个键至多一行
    OneToOne,
    /// 每个键可对应多行
    OneToMany,
}

impl fmt::Display for HashTableLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashTableLayout::OneToOne => write!(f, "OneToOne"),
            HashTableLayout::OneToMany => write!(f, "OneToMany"),
        }
    }
}

/// 哈希表种类及其专有元信息
#[derive(Debug, Clone, PartialEq)]
pub enum JoinHashTableKind {
    /// 以 `key - min_key` 直接寻址
    Perfect { min_key: i64, max_key: i64 },
    /// 通用哈希表，支持复合键
    Baseline { key_component_count: usize },
    /// 范围连接按桶划分
    Overlaps { bucket_sizes: Vec<f64> },
}

/// 连接哈希表
///
/// `slots` 在一对一布局下保存每个键对应的行号；一对多布局下依次为
/// 偏移区、计数区与行号区
#[derive(Debug, Clone, PartialEq)]
pub struct JoinHashTable {
    kind: JoinHashTableKind,
    layout: HashTableLayout,
    key: Option<QueryPlanHash>,
    device: DeviceIdentifier,
    entry_count: usize,
    slots: Vec<i32>,
}

impl JoinHashTable {
    pub fn new(
        kind: JoinHashTableKind,
        layout: HashTableLayout,
        key: Option<QueryPlanHash>,
        device: DeviceIdentifier,
        entry_count: usize,
        slots: Vec<i32>,
    ) -> Self {
        Self {
            kind,
            layout,
            key,
            device,
            entry_count,
            slots,
        }
    }

    /// 由内表连接列构建哈希表，键范围允许时使用完美哈希表，否则退回基线哈希表
    ///
    /// 列为空或行数超出 `i32` 行号范围时返回 None
    pub fn build(
        key: Option<QueryPlanHash>,
        device: DeviceIdentifier,
        join_column: &[i64],
    ) -> Option<Self> {
        if join_column.is_empty() {
            return None;
        }
        Self::build_perfect(key, device, join_column).or_else(|| {
            log::debug!("连接列键范围过大，改用基线哈希表");
            let composite_keys: Vec<Vec<i64>> =
                join_column.iter().map(|value| vec![*value]).collect();
            Self::build_baseline(key, device, &composite_keys)
        })
    }

    /// 由内表连接列构建完美哈希表
    ///
    /// 出现重复键时自动使用一对多布局。列为空、键范围超过
    /// `MAX_PERFECT_HASH_RANGE` 或行数超出 `i32` 行号范围时返回 None
    pub fn build_perfect(
        key: Option<QueryPlanHash>,
        device: DeviceIdentifier,
        join_column: &[i64],
    ) -> Option<Self> {
        let min_key = *join_column.iter().min()?;
        let max_key = *join_column.iter().max()?;
        let range = max_key
            .checked_sub(min_key)
            .and_then(|span| usize::try_from(span).ok())
            .and_then(|span| span.checked_add(1))
            .filter(|range| *range <= MAX_PERFECT_HASH_RANGE)?;
        i32::try_from(join_column.len()).ok()?;

        let bucket = |value: i64| (value - min_key) as usize;
        let mut counts = vec![0i32; range];
        for value in join_column {
            counts[bucket(*value)] += 1;
        }
        let kind = JoinHashTableKind::Perfect { min_key, max_key };

        if counts.iter().all(|count| *count <= 1) {
            let mut slots = vec![EMPTY_SLOT; range];
            for (row, value) in join_column.iter().enumerate() {
                slots[bucket(*value)] = i32::try_from(row).ok()?;
            }
            return Some(Self::new(
                kind,
                HashTableLayout::OneToOne,
                key,
                device,
                range,
                slots,
            ));
        }

        let mut offsets = Vec::with_capacity(range);
        let mut next = 0i32;
        for count in &counts {
            offsets.push(next);
            next += count;
        }
        let mut rows = vec![EMPTY_SLOT; join_column.len()];
        let mut cursor = offsets.clone();
        for (row, value) in join_column.iter().enumerate() {
            let slot = bucket(*value);
            rows[cursor[slot] as usize] = i32::try_from(row).ok()?;
            cursor[slot] += 1;
        }

        let mut slots = offsets;
        slots.extend_from_slice(&counts);
        slots.extend_from_slice(&rows);
        Some(Self::new(
            kind,
            HashTableLayout::OneToMany,
            key,
            device,
            range,
            slots,
        ))
    }

    /// 由复合键构建基线哈希表，行数超出 `i32` 行号范围时返回 None
    pub fn build_baseline(
        key: Option<QueryPlanHash>,
        device: DeviceIdentifier,
        composite_keys: &[Vec<i64>],
    ) -> Option<Self> {
        let key_component_count = composite_keys.first().map(Vec::len).unwrap_or(0);
        let mut groups: BTreeMap<&[i64], Vec<i32>> = BTreeMap::new();
        for (row, composite) in composite_keys.iter().enumerate() {
            let row = i32::try_from(row).ok()?;
            groups.entry(composite.as_slice()).or_default().push(row);
        }
        let layout = if groups.values().all(|rows| rows.len() == 1) {
            HashTableLayout::OneToOne
        } else {
            HashTableLayout::OneToMany
        };
        let slots = groups.values().flatten().copied().collect();
        Some(Self::new(
            JoinHashTableKind::Baseline { key_component_count },
            layout,
            key,
            device,
            groups.len(),
            slots,
        ))
    }

    pub fn kind(&self) -> &JoinHashTableKind {
        &self.kind
    }

    pub fn layout(&self) -> HashTableLayout {
        self.layout
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    pub fn slots(&self) -> &[i32] {
        &self.slots
    }

    /// 完美哈希表一对一布局下按键查找行号
    pub fn probe_perfect(&self, value: i64) -> Option<i32> {
        match (&self.kind, self.layout) {
            (JoinHashTableKind::Perfect { min_key, max_key }, HashTableLayout::OneToOne)
                if (*min_key..=*max_key).contains(&value) =>
            {
                let slot = self.slots[(value - min_key) as usize];
                (slot != EMPTY_SLOT).then_some(slot)
            }
            _ => None,
        }
    }
}

impl RecyclableItem for JoinHashTable {
    fn item_type(&self) -> CacheItemType {
        match self.kind {
            JoinHashTableKind::Perfect { .. } => CacheItemType::PerfectHt,
            JoinHashTableKind::Baseline { .. } => CacheItemType::BaselineHt,
            JoinHashTableKind::Overlaps { .. } => CacheItemType::OverlapsHt,
        }
    }

    fn estimate_size(&self) -> u64 {
        (self.slots.len() * mem::size_of::<i32>()) as u64
    }

    fn key_of(&self) -> Option<QueryPlanHash> {
        self.key
    }

    fn device_of(&self) -> DeviceIdentifier {
        self.device
    }
}

/// 计算连接哈希表的缓存键
///
/// 除 DAG 与设备外，还区分布局与内外表连接列
pub fn hashtable_cache_key(
    dag: &ExtractedPlanDag,
    device: DeviceIdentifier,
    layout: HashTableLayout,
    inner_outer: &str,
) -> Option<QueryPlanHash> {
    QueryPlanHash::compute(dag, device, &(layout, inner_outer))
}
