//! 集成测试共享工具模块
//!
//! 提供测试基础设施和辅助函数，供所有集成测试使用

#![allow(dead_code)]

pub mod assertions;
pub mod data_fixtures;

use datarecycler::config::{Config, DagCacheConfig};
use datarecycler::dag::{ExtractedPlanDag, QueryPlanDagExtractor, VisitedNodes};
use datarecycler::plan::{
    InMemorySchemaProvider, JoinTreeId, JoinTreeInfo, PlanNode, RelAlgTranslator, TableInfo,
    TableRef,
};
use datarecycler::ExecutorContext;

/// 测试用表
pub const T1: TableRef = TableRef { db_id: 1, table_id: 1 };
pub const T2: TableRef = TableRef { db_id: 1, table_id: 2 };
pub const T3: TableRef = TableRef { db_id: 1, table_id: 3 };

/// 计划提取测试环境
///
/// 持有目录、表达式翻译器与执行器上下文，每个测试独立一份
pub struct TestPlanner {
    pub schema: InMemorySchemaProvider,
    pub translator: RelAlgTranslator,
    pub executor: ExecutorContext,
}

impl TestPlanner {
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    /// 使用指定的 DAG 缓存上限
    pub fn with_dag_limits(max_node_map_bytes: u64, bytes_per_node: u64) -> Self {
        let config = Config {
            dag_cache: DagCacheConfig {
                max_node_map_bytes,
                bytes_per_node,
            },
            ..Config::default()
        };
        Self::with_config(&config)
    }

    pub fn with_config(config: &Config) -> Self {
        let schema = InMemorySchemaProvider::new();
        for (table, name) in [(T1, "t1"), (T2, "t2"), (T3, "t3")] {
            schema.add_table(TableInfo::new(
                table,
                name,
                vec!["x".to_string(), "y".to_string(), "z".to_string()],
            ));
        }
        Self {
            schema,
            translator: RelAlgTranslator::new(),
            executor: ExecutorContext::new(config),
        }
    }

    /// 提取不含左深连接的计划
    pub fn extract(&self, root: &PlanNode) -> ExtractedPlanDag {
        self.extract_join(root, None, &JoinTreeInfo::new())
    }

    /// 提取含左深连接的计划
    pub fn extract_join(
        &self,
        root: &PlanNode,
        join_tree_id: Option<JoinTreeId>,
        join_tree_info: &JoinTreeInfo,
    ) -> ExtractedPlanDag {
        QueryPlanDagExtractor::extract_query_plan_dag(
            root,
            &self.schema,
            join_tree_id,
            join_tree_info,
            &mut VisitedNodes::new(),
            &self.executor,
            &self.translator,
        )
    }

    /// DAG 缓存当前占用字节数
    pub fn dag_cache_size(&self) -> u64 {
        self.executor.dag_cache().get_current_node_map_size()
    }
}

impl Default for TestPlanner {
    fn default() -> Self {
        Self::new()
    }
}
