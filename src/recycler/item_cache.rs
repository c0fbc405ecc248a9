//! 通用缓存项回收器
//!
//! 按 (缓存项类型, 设备) 划分分区，每个分区持有独立的互斥锁与容量计数。
//! 容量不足时按使用次数从低到高淘汰，次数相同时先淘汰插入最早的项。
//! 缓存项以 `Arc` 共享，已交给调用方的项在被淘汰后依然有效。

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use super::budget::CacheBudget;
use super::item::{CacheItemType, RecyclableItem};
use super::key::QueryPlanHash;
use super::metric::CacheItemMetric;
use super::stats::{RecyclerStatsCollector, RecyclerStatsSnapshot};
use crate::core::device::DeviceIdentifier;

type PartitionKey = (CacheItemType, DeviceIdentifier);

/// 插入被拒绝的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// 超过单项上限
    ExceedsItemLimit { size: u64, limit: u64 },
    /// 超过分区总容量
    ExceedsTotalLimit { size: u64, limit: u64 },
    /// 淘汰后仍无法腾出空间
    InsufficientSpace { size: u64, available: u64 },
    /// 缓存项没有缓存键
    MissingKey,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::ExceedsItemLimit { size, limit } => {
                write!(f, "缓存项大小 {} 超过单项上限 {}", size, limit)
            }
            RejectReason::ExceedsTotalLimit { size, limit } => {
                write!(f, "缓存项大小 {} 超过分区总容量 {}", size, limit)
            }
            RejectReason::InsufficientSpace { size, available } => {
                write!(f, "需要 {} 字节但只能腾出 {} 字节", size, available)
            }
            RejectReason::MissingKey => write!(f, "缓存项没有缓存键"),
        }
    }
}

/// 插入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutResult {
    Accepted,
    Rejected(RejectReason),
}

impl PutResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, PutResult::Accepted)
    }
}

/// 缓存命中时交给调用方的句柄
pub struct CachedItemHandle<A> {
    item: Arc<A>,
    metric: Arc<CacheItemMetric>,
}

impl<A> CachedItemHandle<A> {
    pub fn item(&self) -> &Arc<A> {
        &self.item
    }

    pub fn metric(&self) -> &CacheItemMetric {
        &self.metric
    }

    pub fn into_inner(self) -> Arc<A> {
        self.item
    }
}

impl<A> Clone for CachedItemHandle<A> {
    fn clone(&self) -> Self {
        Self {
            item: Arc::clone(&self.item),
            metric: Arc::clone(&self.metric),
        }
    }
}

impl<A> Deref for CachedItemHandle<A> {
    type Target = A;

    fn deref(&self) -> &A {
        &self.item
    }
}

impl<A> fmt::Debug for CachedItemHandle<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedItemHandle")
            .field("metric", &self.metric)
            .finish()
    }
}

/// `get_or_build` 的结果
pub enum Recycled<A> {
    /// 缓存命中
    Hit(CachedItemHandle<A>),
    /// 新构建，`retained` 表示是否被放入缓存
    Built { item: Arc<A>, retained: bool },
}

impl<A> Recycled<A> {
    pub fn is_hit(&self) -> bool {
        matches!(self, Recycled::Hit(_))
    }

    pub fn item(&self) -> &Arc<A> {
        match self {
            Recycled::Hit(handle) => handle.item(),
            Recycled::Built { item, .. } => item,
        }
    }

    pub fn into_inner(self) -> Arc<A> {
        match self {
            Recycled::Hit(handle) => handle.into_inner(),
            Recycled::Built { item, .. } => item,
        }
    }
}

struct CacheEntry<A> {
    item: Arc<A>,
    metric: Arc<CacheItemMetric>,
}

struct Partition<A> {
    entries: HashMap<QueryPlanHash, CacheEntry<A>>,
    current_size: u64,
}

impl<A> Partition<A> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            current_size: 0,
        }
    }

    fn remove(&mut self, key: &QueryPlanHash) -> Option<CacheEntry<A>> {
        let entry = self.entries.remove(key)?;
        self.current_size -= entry.metric.mem_size();
        Some(entry)
    }

    fn pick_victim(&self) -> Option<QueryPlanHash> {
        self.entries
            .iter()
            .min_by_key(|(_, entry)| entry.metric.eviction_rank())
            .map(|(key, _)| *key)
    }
}

/// 通用缓存项回收器
pub struct ItemCache<A> {
    name: String,
    partitions: DashMap<PartitionKey, Arc<Mutex<Partition<A>>>>,
    budgets: DashMap<CacheItemType, CacheBudget>,
    insertion_seq: AtomicU64,
    stats: RecyclerStatsCollector,
}

impl<A: Send + Sync + 'static> ItemCache<A> {
    /// 创建回收器，未给出预算的类型使用默认预算
    pub fn new<I>(name: impl Into<String>, budgets: I) -> Self
    where
        I: IntoIterator<Item = (CacheItemType, CacheBudget)>,
    {
        let cache = Self {
            name: name.into(),
            partitions: DashMap::new(),
            budgets: DashMap::new(),
            insertion_seq: AtomicU64::new(0),
            stats: RecyclerStatsCollector::new(),
        };
        for (item_type, budget) in budgets {
            cache.budgets.insert(item_type, budget);
        }
        cache
    }

    /// 所有类型使用同一预算
    pub fn with_uniform_budget(name: impl Into<String>, budget: CacheBudget) -> Self {
        Self::new(name, CacheItemType::ALL.iter().map(|t| (*t, budget)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn budget(&self, item_type: CacheItemType) -> CacheBudget {
        self.budgets
            .get(&item_type)
            .map(|budget| *budget)
            .unwrap_or_default()
    }

    fn partition(&self, item_type: CacheItemType, device: DeviceIdentifier) -> Arc<Mutex<Partition<A>>> {
        self.partitions
            .entry((item_type, device))
            .or_insert_with(|| Arc::new(Mutex::new(Partition::new())))
            .value()
            .clone()
    }

    fn existing_partition(
        &self,
        item_type: CacheItemType,
        device: DeviceIdentifier,
    ) -> Option<Arc<Mutex<Partition<A>>>> {
        self.partitions
            .get(&(item_type, device))
            .map(|partition| partition.value().clone())
    }

    /// 放入缓存项
    pub fn put(
        &self,
        key: QueryPlanHash,
        item_type: CacheItemType,
        device: DeviceIdentifier,
        item: A,
        mem_size: u64,
    ) -> PutResult {
        self.put_shared(key, item_type, device, Arc::new(item), mem_size)
    }

    /// 放入已共享的缓存项
    pub fn put_shared(
        &self,
        key: QueryPlanHash,
        item_type: CacheItemType,
        device: DeviceIdentifier,
        item: Arc<A>,
        mem_size: u64,
    ) -> PutResult {
        let partition = self.partition(item_type, device);
        let mut partition = partition.lock();

        // 预算在分区锁内读取，淘汰与准入判断使用同一份预算
        let budget = self.budget(item_type);
        if let Some(reason) = admission_check(&budget, mem_size) {
            drop(partition);
            return self.reject(key, item_type, device, reason);
        }
        if partition.entries.contains_key(&key) {
            log::debug!("[{}] 缓存项 {} 已存在，保留原有项", self.name, key);
            return PutResult::Accepted;
        }

        if !self.evict_locked(&mut partition, item_type, device, mem_size, budget.max_total_bytes) {
            let available = budget.max_total_bytes.saturating_sub(partition.current_size);
            drop(partition);
            return self.reject(
                key,
                item_type,
                device,
                RejectReason::InsufficientSpace {
                    size: mem_size,
                    available,
                },
            );
        }

        let seq = self.insertion_seq.fetch_add(1, Ordering::Relaxed);
        let metric = Arc::new(CacheItemMetric::new(key, item_type, device, mem_size, seq));
        partition.entries.insert(key, CacheEntry { item, metric });
        partition.current_size += mem_size;
        self.stats.record_accepted();
        log::debug!(
            "[{}] 缓存项 {} 已放入 {}/设备{}，大小 {}，分区占用 {}",
            self.name,
            key,
            item_type,
            device,
            mem_size,
            partition.current_size
        );
        PutResult::Accepted
    }

    fn reject(
        &self,
        key: QueryPlanHash,
        item_type: CacheItemType,
        device: DeviceIdentifier,
        reason: RejectReason,
    ) -> PutResult {
        self.stats.record_rejected();
        log::debug!(
            "[{}] 拒绝缓存项 {} ({}/设备{}): {}",
            self.name,
            key,
            item_type,
            device,
            reason
        );
        PutResult::Rejected(reason)
    }

    fn evict_locked(
        &self,
        partition: &mut Partition<A>,
        item_type: CacheItemType,
        device: DeviceIdentifier,
        needed: u64,
        max_total: u64,
    ) -> bool {
        while partition.current_size.saturating_add(needed) > max_total {
            let Some(victim) = partition.pick_victim() else {
                return false;
            };
            if let Some(entry) = partition.remove(&victim) {
                let size = entry.metric.mem_size();
                self.stats.record_eviction(size);
                log::debug!(
                    "[{}] 淘汰缓存项 {} ({}/设备{})，大小 {}，使用次数 {}",
                    self.name,
                    victim,
                    item_type,
                    device,
                    size,
                    entry.metric.ref_count()
                );
            }
        }
        true
    }

    /// 淘汰缓存项直到分区能再容纳 `needed` 字节
    pub fn evict_to_fit(&self, item_type: CacheItemType, device: DeviceIdentifier, needed: u64) -> bool {
        let partition = self.partition(item_type, device);
        let mut partition = partition.lock();
        let max_total = self.budget(item_type).max_total_bytes;
        if needed > max_total {
            return false;
        }
        self.evict_locked(&mut partition, item_type, device, needed, max_total)
    }

    /// 查找缓存项，命中时增加使用次数
    pub fn get(
        &self,
        key: QueryPlanHash,
        item_type: CacheItemType,
        device: DeviceIdentifier,
    ) -> Option<CachedItemHandle<A>> {
        let handle = self
            .with_partition(item_type, device, |partition| {
                partition.entries.get(&key).map(|entry| {
                    entry.metric.touch();
                    CachedItemHandle {
                        item: Arc::clone(&entry.item),
                        metric: Arc::clone(&entry.metric),
                    }
                })
            })
            .flatten();

        match handle {
            Some(handle) => {
                self.stats.record_hit(item_type);
                Some(handle)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    fn with_partition<R>(
        &self,
        item_type: CacheItemType,
        device: DeviceIdentifier,
        f: impl FnOnce(&mut Partition<A>) -> R,
    ) -> Option<R> {
        let partition = self.existing_partition(item_type, device)?;
        let mut guard = partition.lock();
        let result = f(&mut guard);
        Some(result)
    }

    pub fn contains(&self, key: QueryPlanHash, item_type: CacheItemType, device: DeviceIdentifier) -> bool {
        self.with_partition(item_type, device, |partition| partition.entries.contains_key(&key))
            .unwrap_or(false)
    }

    /// 调整某类型的分区总容量，超出部分在下一次插入时淘汰
    pub fn set_total_cache_size(&self, item_type: CacheItemType, max_total_bytes: u64) {
        self.budgets
            .entry(item_type)
            .or_default()
            .max_total_bytes = max_total_bytes;
        log::info!("[{}] {} 分区总容量调整为 {}", self.name, item_type, max_total_bytes);
    }

    /// 调整某类型的单项上限，已缓存的项不受影响
    pub fn set_max_cache_item_size(&self, item_type: CacheItemType, max_item_bytes: u64) {
        self.budgets
            .entry(item_type)
            .or_default()
            .max_item_bytes = max_item_bytes;
        log::info!("[{}] {} 单项上限调整为 {}", self.name, item_type, max_item_bytes);
    }

    pub fn get_current_cache_size_for_device(&self, item_type: CacheItemType, device: DeviceIdentifier) -> u64 {
        self.with_partition(item_type, device, |partition| partition.current_size)
            .unwrap_or(0)
    }

    pub fn num_cached_items(&self, item_type: CacheItemType, device: DeviceIdentifier) -> usize {
        self.with_partition(item_type, device, |partition| partition.entries.len())
            .unwrap_or(0)
    }

    /// 分区内全部缓存键，按键排序
    pub fn cached_keys(&self, item_type: CacheItemType, device: DeviceIdentifier) -> Vec<QueryPlanHash> {
        let mut keys: Vec<QueryPlanHash> = self
            .with_partition(item_type, device, |partition| {
                partition.entries.keys().copied().collect()
            })
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// 读取缓存项指标，不计入使用次数
    pub fn metric(
        &self,
        key: QueryPlanHash,
        item_type: CacheItemType,
        device: DeviceIdentifier,
    ) -> Option<Arc<CacheItemMetric>> {
        self.with_partition(item_type, device, |partition| {
            partition.entries.get(&key).map(|entry| Arc::clone(&entry.metric))
        })
        .flatten()
    }

    pub fn remove_item(&self, key: QueryPlanHash, item_type: CacheItemType, device: DeviceIdentifier) -> bool {
        let removed = self
            .with_partition(item_type, device, |partition| partition.remove(&key))
            .flatten();
        match removed {
            Some(entry) => {
                log::debug!("[{}] 移除缓存项 {}，大小 {}", self.name, key, entry.metric.mem_size());
                true
            }
            None => false,
        }
    }

    /// 清空一个分区
    pub fn clear_cache(&self, item_type: CacheItemType, device: DeviceIdentifier) {
        self.with_partition(item_type, device, |partition| {
            partition.entries.clear();
            partition.current_size = 0;
        });
        log::debug!("[{}] 已清空 {}/设备{}", self.name, item_type, device);
    }

    /// 清空所有分区
    pub fn clear_all(&self) {
        let partitions: Vec<_> = self
            .partitions
            .iter()
            .map(|partition| partition.value().clone())
            .collect();
        for partition in partitions {
            let mut partition = partition.lock();
            partition.entries.clear();
            partition.current_size = 0;
        }
        log::info!("[{}] 已清空全部缓存", self.name);
    }

    /// 命中则复用，否则在锁外构建并按给定大小尝试放入缓存
    pub fn get_or_build_with<F, E>(
        &self,
        key: QueryPlanHash,
        item_type: CacheItemType,
        device: DeviceIdentifier,
        mem_size: u64,
        build: F,
    ) -> Result<Recycled<A>, E>
    where
        F: FnOnce() -> Result<A, E>,
    {
        self.get_or_build_sized(key, item_type, device, build, |_| mem_size)
    }

    fn get_or_build_sized<F, S, E>(
        &self,
        key: QueryPlanHash,
        item_type: CacheItemType,
        device: DeviceIdentifier,
        build: F,
        size_of: S,
    ) -> Result<Recycled<A>, E>
    where
        F: FnOnce() -> Result<A, E>,
        S: FnOnce(&A) -> u64,
    {
        if let Some(handle) = self.get(key, item_type, device) {
            return Ok(Recycled::Hit(handle));
        }
        let item = Arc::new(build()?);
        let mem_size = size_of(&item);
        let retained = self
            .put_shared(key, item_type, device, Arc::clone(&item), mem_size)
            .is_accepted();
        Ok(Recycled::Built { item, retained })
    }

    pub fn stats(&self) -> RecyclerStatsSnapshot {
        self.stats.snapshot()
    }
}

impl<A: RecyclableItem> ItemCache<A> {
    /// 依据缓存项自身信息放入缓存
    pub fn put_item(&self, item: A) -> PutResult {
        let item_type = item.item_type();
        let device = item.device_of();
        let Some(key) = item.key_of() else {
            return PutResult::Rejected(RejectReason::MissingKey);
        };
        let mem_size = item.estimate_size();
        self.put(key, item_type, device, item, mem_size)
    }

    /// 命中则复用，否则在锁外构建并按估算大小尝试放入缓存
    pub fn get_or_build<F, E>(
        &self,
        key: QueryPlanHash,
        item_type: CacheItemType,
        device: DeviceIdentifier,
        build: F,
    ) -> Result<Recycled<A>, E>
    where
        F: FnOnce() -> Result<A, E>,
    {
        self.get_or_build_sized(key, item_type, device, build, |item| item.estimate_size())
    }
}

/// 按预算检查单项与总容量上限，超出时返回拒绝原因
fn admission_check(budget: &CacheBudget, mem_size: u64) -> Option<RejectReason> {
    if mem_size > budget.max_item_bytes {
        return Some(RejectReason::ExceedsItemLimit {
            size: mem_size,
            limit: budget.max_item_bytes,
        });
    }
    if mem_size > budget.max_total_bytes {
        return Some(RejectReason::ExceedsTotalLimit {
            size: mem_size,
            limit: budget.max_total_bytes,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::device::CPU_DEVICE_IDENTIFIER;

    const T: CacheItemType = CacheItemType::PerfectHt;
    const CPU: DeviceIdentifier = CPU_DEVICE_IDENTIFIER;

    fn cache(max_total: u64, max_item: u64) -> ItemCache<Vec<u8>> {
        ItemCache::with_uniform_budget("test", CacheBudget::new(max_total, max_item))
    }

    fn key(raw: u64) -> QueryPlanHash {
        QueryPlanHash::new(raw)
    }

    #[test]
    fn test_put_and_get() {
        let cache = cache(100, 100);
        assert!(cache.put(key(1), T, CPU, vec![1, 2], 12).is_accepted());
        let handle = cache.get(key(1), T, CPU).expect("缓存项应存在");
        assert_eq!(*handle, vec![1, 2]);
        assert_eq!(handle.metric().ref_count(), 2);
        assert!(cache.get(key(2), T, CPU).is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.accepted, 1);
    }

    #[test]
    fn test_total_bound_evicts_smaller() {
        let cache = cache(30, 30);
        cache.put(key(1), T, CPU, vec![], 12);
        cache.put(key(2), T, CPU, vec![], 24);
        assert_eq!(cache.get_current_cache_size_for_device(T, CPU), 24);
        assert_eq!(cache.cached_keys(T, CPU), vec![key(2)]);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_eviction_prefers_least_used() {
        let cache = cache(40, 40);
        cache.put(key(1), T, CPU, vec![], 12);
        cache.put(key(2), T, CPU, vec![], 16);
        for _ in 0..3 {
            cache.get(key(1), T, CPU);
        }
        assert_eq!(cache.metric(key(1), T, CPU).map(|m| m.ref_count()), Some(4));
        assert_eq!(cache.metric(key(2), T, CPU).map(|m| m.ref_count()), Some(1));

        assert!(cache.put(key(3), T, CPU, vec![], 20).is_accepted());
        assert!(cache.contains(key(1), T, CPU));
        assert!(!cache.contains(key(2), T, CPU));
        assert_eq!(cache.get_current_cache_size_for_device(T, CPU), 32);
    }

    #[test]
    fn test_tie_breaks_by_insertion_order() {
        let cache = cache(30, 30);
        cache.put(key(7), T, CPU, vec![], 10);
        cache.put(key(3), T, CPU, vec![], 10);
        cache.put(key(5), T, CPU, vec![], 10);
        cache.put(key(9), T, CPU, vec![], 10);
        assert!(!cache.contains(key(7), T, CPU));
        assert_eq!(cache.num_cached_items(T, CPU), 3);
    }

    #[test]
    fn test_item_limit_rejects() {
        let cache = cache(100, 18);
        cache.put(key(1), T, CPU, vec![], 12);
        cache.put(key(2), T, CPU, vec![], 16);
        let result = cache.put(key(3), T, CPU, vec![], 20);
        assert_eq!(
            result,
            PutResult::Rejected(RejectReason::ExceedsItemLimit { size: 20, limit: 18 })
        );
        assert_eq!(cache.get_current_cache_size_for_device(T, CPU), 28);
        assert_eq!(cache.stats().rejected, 1);
    }

    #[test]
    fn test_total_limit_rejects_without_eviction() {
        let cache = cache(10, 100);
        cache.put(key(1), T, CPU, vec![], 8);
        let result = cache.put(key(2), T, CPU, vec![], 11);
        assert!(matches!(
            result,
            PutResult::Rejected(RejectReason::ExceedsTotalLimit { .. })
        ));
        assert!(cache.contains(key(1), T, CPU));
    }

    #[test]
    fn test_duplicate_put_keeps_existing() {
        let cache = cache(100, 100);
        cache.put(key(1), T, CPU, vec![1], 10);
        assert!(cache.put(key(1), T, CPU, vec![2], 20).is_accepted());
        assert_eq!(*cache.get(key(1), T, CPU).expect("缓存项应存在"), vec![1]);
        assert_eq!(cache.get_current_cache_size_for_device(T, CPU), 10);
    }

    #[test]
    fn test_evict_to_fit() {
        let cache = cache(30, 30);
        cache.put(key(1), T, CPU, vec![], 10);
        cache.put(key(2), T, CPU, vec![], 10);
        assert!(cache.evict_to_fit(T, CPU, 15));
        assert_eq!(cache.cached_keys(T, CPU), vec![key(2)]);
        assert!(!cache.evict_to_fit(T, CPU, 31));
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = cache(100, 100);
        cache.put(key(1), T, CPU, vec![], 10);
        cache.put(key(2), T, CPU, vec![], 10);
        cache.put(key(3), CacheItemType::BaselineHt, CPU, vec![], 10);

        assert!(cache.remove_item(key(1), T, CPU));
        assert!(!cache.remove_item(key(1), T, CPU));
        assert_eq!(cache.get_current_cache_size_for_device(T, CPU), 10);

        cache.clear_cache(T, CPU);
        assert_eq!(cache.num_cached_items(T, CPU), 0);
        assert_eq!(cache.num_cached_items(CacheItemType::BaselineHt, CPU), 1);

        cache.clear_all();
        assert_eq!(cache.num_cached_items(CacheItemType::BaselineHt, CPU), 0);
    }
}
