//! 执行器上下文
//!
//! 持有跨查询共享的 DAG 缓存与哈希表回收器，按引用传给提取器与执行器

use std::sync::Arc;

use crate::config::Config;
use crate::dag::QueryPlanDagCache;
use crate::recycler::HashtableRecycler;

pub struct ExecutorContext {
    config: Config,
    dag_cache: Arc<QueryPlanDagCache>,
    hashtable_recycler: Arc<HashtableRecycler>,
}

impl ExecutorContext {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            dag_cache: Arc::new(QueryPlanDagCache::new(&config.dag_cache)),
            hashtable_recycler: Arc::new(HashtableRecycler::from_config(&config.hashtable_cache)),
        }
    }

    /// 与其他上下文共享同一组缓存
    pub fn with_shared(
        config: &Config,
        dag_cache: Arc<QueryPlanDagCache>,
        hashtable_recycler: Arc<HashtableRecycler>,
    ) -> Self {
        Self {
            config: config.clone(),
            dag_cache,
            hashtable_recycler,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dag_cache(&self) -> &Arc<QueryPlanDagCache> {
        &self.dag_cache
    }

    pub fn hashtable_recycler(&self) -> &Arc<HashtableRecycler> {
        &self.hashtable_recycler
    }

    /// 清空 DAG 缓存与全部回收器分区
    pub fn reset(&self) {
        self.dag_cache.clear_query_plan_cache();
        self.hashtable_recycler.clear_all();
        log::info!("执行器上下文已重置");
    }
}

impl Default for ExecutorContext {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::device::CPU_DEVICE_IDENTIFIER;
    use crate::dag::NodeSignature;
    use crate::plan::RelKind;
    use crate::recycler::{CacheItemType, JoinHashTable, QueryPlanHash};

    #[test]
    fn test_reset_clears_both_caches() {
        let ctx = ExecutorContext::default();
        let sig = NodeSignature::new(RelKind::Scan, "1:1".to_string(), Vec::new());
        assert_eq!(ctx.dag_cache().get_or_assign_id(&sig), Some(0));

        let table = JoinHashTable::build_perfect(Some(QueryPlanHash::new(1)), CPU_DEVICE_IDENTIFIER, &[1, 2])
            .expect("非空列应能构建");
        assert!(ctx.hashtable_recycler().put_item(table).is_accepted());

        ctx.reset();
        assert_eq!(ctx.dag_cache().unique_node_count(), 0);
        assert_eq!(
            ctx.hashtable_recycler()
                .num_cached_items(CacheItemType::PerfectHt, CPU_DEVICE_IDENTIFIER),
            0
        );
    }

    #[test]
    fn test_shared_caches() {
        let a = ExecutorContext::default();
        let b = ExecutorContext::with_shared(
            a.config(),
            Arc::clone(a.dag_cache()),
            Arc::clone(a.hashtable_recycler()),
        );
        assert!(Arc::ptr_eq(a.dag_cache(), b.dag_cache()));
    }
}
