//! 回收器统计收集器
//!
//! 记录命中、未命中、接受、拒绝与淘汰次数，以快照形式对外提供

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use super::item::CacheItemType;

/// 回收器统计快照
#[derive(Debug, Clone, Default)]
pub struct RecyclerStatsSnapshot {
    /// 命中次数
    pub hits: u64,
    /// 未命中次数
    pub misses: u64,
    /// 接受的插入次数
    pub accepted: u64,
    /// 拒绝的插入次数
    pub rejected: u64,
    /// 淘汰的缓存项数
    pub evictions: u64,
    /// 淘汰释放的字节数
    pub evicted_bytes: u64,
    /// 各类型的命中次数
    pub hits_by_type: HashMap<CacheItemType, u64>,
}

impl RecyclerStatsSnapshot {
    /// 命中率
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// 回收器统计收集器
#[derive(Debug, Default)]
pub struct RecyclerStatsCollector {
    hits: AtomicU64,
    misses: AtomicU64,
    accepted: AtomicU64,
    rejected: AtomicU64,
    evictions: AtomicU64,
    evicted_bytes: AtomicU64,
    hits_by_type: DashMap<CacheItemType, AtomicU64>,
}

impl RecyclerStatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self, item_type: CacheItemType) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        self.hits_by_type
            .entry(item_type)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录一次淘汰及其释放的字节数
    pub fn record_eviction(&self, bytes: u64) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
        self.evicted_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RecyclerStatsSnapshot {
        let hits_by_type = self
            .hits_by_type
            .iter()
            .map(|entry| (*entry.key(), entry.value().load(Ordering::Relaxed)))
            .collect();

        RecyclerStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            evicted_bytes: self.evicted_bytes.load(Ordering::Relaxed),
            hits_by_type,
        }
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.accepted.store(0, Ordering::Relaxed);
        self.rejected.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.evicted_bytes.store(0, Ordering::Relaxed);
        self.hits_by_type.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recycler_stats_collector() {
        let collector = RecyclerStatsCollector::new();

        collector.record_hit(CacheItemType::PerfectHt);
        collector.record_hit(CacheItemType::PerfectHt);
        collector.record_hit(CacheItemType::BaselineHt);
        collector.record_miss();
        collector.record_accepted();
        collector.record_rejected();
        collector.record_eviction(16);

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.hits, 3);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.accepted, 1);
        assert_eq!(snapshot.rejected, 1);
        assert_eq!(snapshot.evictions, 1);
        assert_eq!(snapshot.evicted_bytes, 16);
        assert_eq!(snapshot.hits_by_type.get(&CacheItemType::PerfectHt), Some(&2));
        assert!((snapshot.hit_rate() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_reset() {
        let collector = RecyclerStatsCollector::new();
        collector.record_hit(CacheItemType::OverlapsHt);
        collector.record_eviction(8);

        collector.reset();

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.hits, 0);
        assert_eq!(snapshot.evicted_bytes, 0);
        assert!(snapshot.hits_by_type.is_empty());
        assert_eq!(snapshot.hit_rate(), 0.0);
    }
}
