//! 缓存项使用指标

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_utils::atomic::AtomicCell;

use super::item::CacheItemType;
use super::key::QueryPlanHash;
use crate::core::device::DeviceIdentifier;

/// 单个缓存项的使用指标
///
/// 以 `Arc` 形式与缓存条目共享，调用方持有的指标在条目被淘汰后仍可读取
#[derive(Debug)]
pub struct CacheItemMetric {
    key: QueryPlanHash,
    item_type: CacheItemType,
    device: DeviceIdentifier,
    mem_size: u64,
    ref_count: AtomicU64,
    insertion_seq: u64,
    created_at: Instant,
    last_accessed: AtomicCell<Instant>,
}

impl CacheItemMetric {
    /// 创建指标，插入即视为第一次使用
    pub fn new(
        key: QueryPlanHash,
        item_type: CacheItemType,
        device: DeviceIdentifier,
        mem_size: u64,
        insertion_seq: u64,
    ) -> Self {
        let now = Instant::now();
        Self {
            key,
            item_type,
            device,
            mem_size,
            ref_count: AtomicU64::new(1),
            insertion_seq,
            created_at: now,
            last_accessed: AtomicCell::new(now),
        }
    }

    /// 记录一次复用
    pub fn touch(&self) {
        self.ref_count.fetch_add(1, Ordering::Relaxed);
        self.last_accessed.store(Instant::now());
    }

    pub fn key(&self) -> QueryPlanHash {
        self.key
    }

    pub fn item_type(&self) -> CacheItemType {
        self.item_type
    }

    pub fn device(&self) -> DeviceIdentifier {
        self.device
    }

    pub fn mem_size(&self) -> u64 {
        self.mem_size
    }

    /// 累计使用次数
    pub fn ref_count(&self) -> u64 {
        self.ref_count.load(Ordering::Relaxed)
    }

    /// 插入顺序，越小越早
    pub fn insertion_seq(&self) -> u64 {
        self.insertion_seq
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn last_accessed(&self) -> Instant {
        self.last_accessed.load()
    }

    /// 淘汰优先级，越小越先淘汰：使用次数最少，其次插入最早
    pub fn eviction_rank(&self) -> (u64, u64) {
        (self.ref_count(), self.insertion_seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::device::CPU_DEVICE_IDENTIFIER;

    fn metric(seq: u64) -> CacheItemMetric {
        CacheItemMetric::new(
            QueryPlanHash::new(seq),
            CacheItemType::PerfectHt,
            CPU_DEVICE_IDENTIFIER,
            12,
            seq,
        )
    }

    #[test]
    fn test_touch_increments_ref_count() {
        let m = metric(0);
        assert_eq!(m.ref_count(), 1);
        let before = m.last_accessed();
        m.touch();
        m.touch();
        assert_eq!(m.ref_count(), 3);
        assert!(m.last_accessed() >= before);
        assert_eq!(m.mem_size(), 12);
    }

    #[test]
    fn test_eviction_rank_orders_by_frequency_then_age() {
        let old = metric(0);
        let young = metric(1);
        assert!(old.eviction_rank() < young.eviction_rank());

        old.touch();
        assert!(young.eviction_rank() < old.eviction_rank());
    }
}
