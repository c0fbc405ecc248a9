//! 缓存项回收模块
//!
//! 以查询计划哈希为键缓存连接哈希表等昂贵的中间产物

pub mod budget;
pub mod hashtable;
pub mod item;
pub mod item_cache;
pub mod key;
pub mod metric;
pub mod stats;

pub use budget::{CacheBudget, DEFAULT_MAX_ITEM_BYTES, DEFAULT_MAX_TOTAL_BYTES};
pub use hashtable::{
    hashtable_cache_key, HashTableLayout, HashtableRecycler, JoinHashTable, JoinHashTableKind,
    EMPTY_SLOT,
};
pub use item::{CacheItemType, RecyclableItem};
pub use item_cache::{CachedItemHandle, ItemCache, PutResult, Recycled, RejectReason};
pub use key::QueryPlanHash;
pub use metric::CacheItemMetric;
pub use stats::{RecyclerStatsCollector, RecyclerStatsSnapshot};
