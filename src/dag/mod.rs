//! 查询计划 DAG 模块
//!
//! 为结构相同的子计划分配跨查询稳定的节点ID

pub mod dag_cache;
pub mod extractor;
pub mod signature;

pub use dag_cache::{
    DagGeneration, DagNodeId, QueryPlanDagCache, ResolvedSequence, DEFAULT_BYTES_PER_NODE,
    MAX_NODE_CACHE_SIZE,
};
pub use extractor::{
    is_unsupported_expr, ExtractedPlanDag, QueryPlanDagExtractor, VisitedNodes, DAG_DELIMITER,
    MAX_IN_LIST_SIZE_FOR_DAG,
};
pub use signature::NodeSignature;
