//! 查询计划模型
//!
//! DAG 提取所消费的外部输入：计划树、左深连接树信息、模式提供者与表达式翻译器

pub mod expr;
pub mod join_tree;
pub mod node;
pub mod schema;
pub mod translator;

pub use expr::{AggregateFunction, BinaryOperator, Expr, Literal, UnaryOperator};
pub use join_tree::{JoinCondition, JoinQualsPerNestingLevel, JoinTreeId, JoinTreeInfo, JoinType};
pub use node::{PlanNode, PlanNodeId, PlanOp, RelKind, SortDirection, SortField};
pub use schema::{InMemorySchemaProvider, SchemaProvider, TableInfo, TableRef};
pub use translator::{ExpressionTranslator, RelAlgTranslator};
