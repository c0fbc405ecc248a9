//! 测试数据生成模块
//!
//! 提供常用查询计划与连接条件的构造函数

use std::sync::Arc;

use datarecycler::plan::{Expr, JoinCondition, JoinTreeId, JoinTreeInfo, Literal, PlanNode, SortField, TableRef};

/// SELECT x FROM t ORDER BY x
pub fn sort_project_scan(table: TableRef) -> Arc<PlanNode> {
    PlanNode::sort(vec![SortField::asc(0)], project_scan(table))
}

/// SELECT x FROM t
pub fn project_scan(table: TableRef) -> Arc<PlanNode> {
    PlanNode::project(vec![Expr::col(0)], PlanNode::scan(table))
}

/// SELECT COUNT(*) FROM t
pub fn count_scan(table: TableRef) -> Arc<PlanNode> {
    PlanNode::aggregate(0, vec![Expr::count(None)], PlanNode::scan(table))
}

/// SELECT COUNT(*) FROM t ORDER BY 1
pub fn sort_count_scan(table: TableRef) -> Arc<PlanNode> {
    PlanNode::sort(vec![SortField::asc(0)], count_scan(table))
}

/// 带过滤条件 `x < bound` 的扫描
pub fn filtered_scan(table: TableRef, bound: i64) -> Arc<PlanNode> {
    PlanNode::filter(Expr::lt(Expr::col(0), Expr::int(bound)), PlanNode::scan(table))
}

/// 过滤条件为 `x IN (0, 1, ..., n-1)` 的扫描
pub fn in_list_scan(table: TableRef, n: i64) -> Arc<PlanNode> {
    PlanNode::filter(
        Expr::in_list(Expr::col(0), (0..n).map(Literal::Int).collect()),
        PlanNode::scan(table),
    )
}

/// 两表左深连接，连接条件放在编号为 `tree_id` 的连接树中
pub fn two_table_join(
    left: TableRef,
    right: TableRef,
    tree_id: JoinTreeId,
    quals: Vec<Expr>,
) -> (Arc<PlanNode>, JoinTreeInfo) {
    let join = PlanNode::left_deep_join(vec![PlanNode::scan(left), PlanNode::scan(right)]);
    let mut info = JoinTreeInfo::new();
    info.insert(tree_id, vec![JoinCondition::inner(quals)]);
    (join, info)
}
