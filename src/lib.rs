//! DataRecycler - 跨查询复用中间结果的执行期缓存
//!
//! 为结构相同的子计划分配稳定的 DAG 节点ID，并以查询计划哈希为键
//! 缓存连接哈希表等昂贵的中间产物。代价模型依据基准测量数据为计划
//! 选择执行设备。

pub mod config;
pub mod context;
pub mod core;
pub mod cost_model;
pub mod dag;
pub mod plan;
pub mod recycler;
pub mod utils;

pub use config::Config;
pub use context::ExecutorContext;
pub use crate::core::error::{CostModelError, DRResult, DataRecyclerError, ParseError, ParseErrorKind};
