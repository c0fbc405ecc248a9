//! 关系代数计划节点
//!
//! 计划树由规划器构建，这里只提供提取 DAG 所需的最小模型：
//! 节点种类、算子参数与输入节点。节点一经创建即不可变，通过 `Arc` 共享。

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::expr::Expr;
use super::join_tree::JoinType;
use super::schema::TableRef;

/// 计划节点ID，进程内唯一
pub type PlanNodeId = u64;

/// 计划节点ID生成器
struct PlanNodeIdGenerator {
    counter: AtomicU64,
}

impl PlanNodeIdGenerator {
    fn instance() -> &'static Self {
        static INSTANCE: PlanNodeIdGenerator = PlanNodeIdGenerator {
            counter: AtomicU64::new(1), // 0 保留为无效ID
        };
        &INSTANCE
    }

    fn next_id(&self) -> PlanNodeId {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }
}

/// 节点种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelKind {
    Scan,
    Project,
    Filter,
    Aggregate,
    Sort,
    Join,
    LeftDeepJoin,
    Compound,
    Union,
}

impl RelKind {
    pub fn name(&self) -> &'static str {
        match self {
            RelKind::Scan => "Scan",
            RelKind::Project => "Project",
            RelKind::Filter => "Filter",
            RelKind::Aggregate => "Aggregate",
            RelKind::Sort => "Sort",
            RelKind::Join => "Join",
            RelKind::LeftDeepJoin => "LeftDeepJoin",
            RelKind::Compound => "Compound",
            RelKind::Union => "Union",
        }
    }
}

impl fmt::Display for RelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// 排序字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortField {
    pub column: usize,
    pub direction: SortDirection,
    pub nulls_first: bool,
}

impl SortField {
    pub fn asc(column: usize) -> Self {
        Self {
            column,
            direction: SortDirection::Asc,
            nulls_first: false,
        }
    }

    pub fn desc(column: usize) -> Self {
        Self {
            column,
            direction: SortDirection::Desc,
            nulls_first: false,
        }
    }
}

/// 算子及其参数
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOp {
    Scan {
        table: TableRef,
    },
    Project {
        exprs: Vec<Expr>,
    },
    Filter {
        condition: Expr,
    },
    Aggregate {
        group_key_count: usize,
        aggregates: Vec<Expr>,
    },
    Sort {
        keys: Vec<SortField>,
        limit: Option<u64>,
        offset: u64,
    },
    /// 二元连接，连接条件直接挂在节点上
    Join {
        join_type: JoinType,
        condition: Expr,
    },
    /// 左深连接树，连接条件由提取时传入的连接树信息提供
    LeftDeepJoin,
    /// 过滤、分组与投影合并后的节点
    Compound {
        filter: Option<Expr>,
        group_key_count: usize,
        targets: Vec<Expr>,
    },
    Union {
        all: bool,
    },
}

impl PlanOp {
    pub fn kind(&self) -> RelKind {
        match self {
            PlanOp::Scan { .. } => RelKind::Scan,
            PlanOp::Project { .. } => RelKind::Project,
            PlanOp::Filter { .. } => RelKind::Filter,
            PlanOp::Aggregate { .. } => RelKind::Aggregate,
            PlanOp::Sort { .. } => RelKind::Sort,
            PlanOp::Join { .. } => RelKind::Join,
            PlanOp::LeftDeepJoin => RelKind::LeftDeepJoin,
            PlanOp::Compound { .. } => RelKind::Compound,
            PlanOp::Union { .. } => RelKind::Union,
        }
    }

    /// 节点自身携带的表达式（不含左深连接树的连接条件）
    pub fn expressions(&self) -> Vec<&Expr> {
        match self {
            PlanOp::Project { exprs } => exprs.iter().collect(),
            PlanOp::Filter { condition } => vec![condition],
            PlanOp::Aggregate { aggregates, .. } => aggregates.iter().collect(),
            PlanOp::Join { condition, .. } => vec![condition],
            PlanOp::Compound {
                filter, targets, ..
            } => filter.iter().chain(targets.iter()).collect(),
            PlanOp::Scan { .. } | PlanOp::Sort { .. } | PlanOp::LeftDeepJoin | PlanOp::Union { .. } => {
                Vec::new()
            }
        }
    }
}

/// 计划节点
#[derive(Debug, PartialEq)]
pub struct PlanNode {
    id: PlanNodeId,
    op: PlanOp,
    inputs: Vec<Arc<PlanNode>>,
}

impl PlanNode {
    /// 创建新节点并分配唯一ID
    pub fn new(op: PlanOp, inputs: Vec<Arc<PlanNode>>) -> Arc<Self> {
        Arc::new(Self {
            id: PlanNodeIdGenerator::instance().next_id(),
            op,
            inputs,
        })
    }

    pub fn scan(table: TableRef) -> Arc<Self> {
        Self::new(PlanOp::Scan { table }, Vec::new())
    }

    pub fn project(exprs: Vec<Expr>, input: Arc<PlanNode>) -> Arc<Self> {
        Self::new(PlanOp::Project { exprs }, vec![input])
    }

    pub fn filter(condition: Expr, input: Arc<PlanNode>) -> Arc<Self> {
        Self::new(PlanOp::Filter { condition }, vec![input])
    }

    pub fn aggregate(group_key_count: usize, aggregates: Vec<Expr>, input: Arc<PlanNode>) -> Arc<Self> {
        Self::new(
            PlanOp::Aggregate {
                group_key_count,
                aggregates,
            },
            vec![input],
        )
    }

    pub fn sort(keys: Vec<SortField>, input: Arc<PlanNode>) -> Arc<Self> {
        Self::new(
            PlanOp::Sort {
                keys,
                limit: None,
                offset: 0,
            },
            vec![input],
        )
    }

    pub fn left_deep_join(inputs: Vec<Arc<PlanNode>>) -> Arc<Self> {
        Self::new(PlanOp::LeftDeepJoin, inputs)
    }

    pub fn id(&self) -> PlanNodeId {
        self.id
    }

    pub fn op(&self) -> &PlanOp {
        &self.op
    }

    pub fn kind(&self) -> RelKind {
        self.op.kind()
    }

    pub fn inputs(&self) -> &[Arc<PlanNode>] {
        &self.inputs
    }

    /// 计划树中的节点总数（共享子树按出现次数计）
    pub fn node_count(&self) -> usize {
        1 + self.inputs.iter().map(|input| input.node_count()).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_ids_are_unique() {
        let table = TableRef::new(1, 1);
        let a = PlanNode::scan(table);
        let b = PlanNode::scan(table);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.op(), b.op());
    }

    #[test]
    fn test_node_count_and_kind() {
        let scan = PlanNode::scan(TableRef::new(1, 1));
        let project = PlanNode::project(vec![Expr::col(0)], scan);
        let sort = PlanNode::sort(vec![SortField::asc(0)], project);
        assert_eq!(sort.node_count(), 3);
        assert_eq!(sort.kind(), RelKind::Sort);
        assert_eq!(sort.inputs()[0].kind(), RelKind::Project);
    }

    #[test]
    fn test_compound_expressions_include_filter() {
        let op = PlanOp::Compound {
            filter: Some(Expr::lt(Expr::col(0), Expr::int(3))),
            group_key_count: 1,
            targets: vec![Expr::col(0), Expr::count(None)],
        };
        assert_eq!(op.expressions().len(), 3);
        assert!(PlanOp::LeftDeepJoin.expressions().is_empty());
    }
}
