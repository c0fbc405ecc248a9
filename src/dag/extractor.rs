//! 查询计划 DAG 提取器
//!
//! 提取分两步：
//! 1. 自底向上为每个计划节点构建签名，同时检测不支持缓存的构造；
//! 2. 自根节点先序遍历，在 DAG 缓存的一个临界区内解析全部签名的ID。
//!
//! 任一节点不支持缓存时整次提取不向 DAG 缓存插入任何节点，返回空 DAG 并置位标志。

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

use super::dag_cache::{DagGeneration, DagNodeId, ResolvedSequence};
use super::signature::NodeSignature;
use crate::context::ExecutorContext;
use crate::plan::{
    Expr, ExpressionTranslator, JoinQualsPerNestingLevel, JoinTreeId, JoinTreeInfo, PlanNode,
    PlanNodeId, PlanOp, SchemaProvider, SortDirection, SortField,
};

/// 可缓存计划中 IN 列表允许的最大元素数
pub const MAX_IN_LIST_SIZE_FOR_DAG: usize = 20;

/// DAG 字符串中节点ID之后的分隔符
pub const DAG_DELIMITER: char = '|';

/// 一次提取的结果
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractedPlanDag {
    /// 以分隔符连接的节点ID序列，如 `"0|1|2|"`；空串表示未缓存
    pub extracted_dag: String,
    /// 先序遍历得到的节点ID
    pub node_ids: Vec<DagNodeId>,
    /// 计划中是否含有不支持缓存的节点
    pub contains_unsupported_node: bool,
    /// 解析ID时 DAG 缓存所处的代数
    pub generation: DagGeneration,
}

impl ExtractedPlanDag {
    fn from_resolved(resolved: ResolvedSequence) -> Self {
        let ResolvedSequence {
            node_ids,
            generation,
        } = resolved;
        let mut extracted_dag = String::with_capacity(node_ids.len() * 3);
        for id in &node_ids {
            let _ = write!(extracted_dag, "{}{}", id, DAG_DELIMITER);
        }
        Self {
            extracted_dag,
            node_ids,
            contains_unsupported_node: false,
            generation,
        }
    }

    fn unsupported() -> Self {
        Self {
            contains_unsupported_node: true,
            ..Self::default()
        }
    }

    /// DAG 是否可以作为缓存键使用
    pub fn is_cacheable(&self) -> bool {
        !self.extracted_dag.is_empty()
    }
}

/// 节点访问结果
#[derive(Debug, Clone)]
enum NodeVisit {
    Supported(Arc<NodeSignature>),
    Unsupported,
}

/// 同一查询内多次提取共享的节点访问记录
///
/// 以计划节点ID为键缓存已构建的签名，只影响提取开销，不影响结果。
/// 记录依赖提取时传入的连接树信息，不应跨查询复用。
#[derive(Debug, Default)]
pub struct VisitedNodes {
    visits: HashMap<PlanNodeId, NodeVisit>,
}

impl VisitedNodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.visits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }

    pub fn contains(&self, node: PlanNodeId) -> bool {
        self.visits.contains_key(&node)
    }
}

/// 查询计划 DAG 提取器
pub struct QueryPlanDagExtractor<'a> {
    schema_provider: &'a dyn SchemaProvider,
    join_tree_id: Option<JoinTreeId>,
    join_tree_info: &'a JoinTreeInfo,
    translator: &'a dyn ExpressionTranslator,
}

impl<'a> QueryPlanDagExtractor<'a> {
    /// 提取查询计划 DAG
    ///
    /// # Panics
    ///
    /// 计划中出现左深连接节点，但 `join_tree_id` 为空或 `join_tree_info`
    /// 中没有对应的连接条件、或条件层数与输入数不符时
    pub fn extract_query_plan_dag(
        root: &PlanNode,
        schema_provider: &'a dyn SchemaProvider,
        join_tree_id: Option<JoinTreeId>,
        join_tree_info: &'a JoinTreeInfo,
        visited: &mut VisitedNodes,
        executor: &ExecutorContext,
        translator: &'a dyn ExpressionTranslator,
    ) -> ExtractedPlanDag {
        let extractor = Self {
            schema_provider,
            join_tree_id,
            join_tree_info,
            translator,
        };

        let root_signature = match extractor.visit(root, visited) {
            Some(signature) => signature,
            None => {
                log::debug!("计划 {} 含有不支持缓存的节点，跳过 DAG 提取", root.id());
                return ExtractedPlanDag::unsupported();
            }
        };

        let mut ordered = Vec::with_capacity(root.node_count());
        collect_pre_order(&root_signature, &mut ordered);

        match executor.dag_cache().resolve_sequence(&ordered) {
            Some(resolved) => {
                let dag = ExtractedPlanDag::from_resolved(resolved);
                log::trace!("计划 {} 的 DAG: {}", root.id(), dag.extracted_dag);
                dag
            }
            None => ExtractedPlanDag::default(),
        }
    }

    /// 自底向上构建签名，不支持缓存时返回 None
    fn visit(&self, node: &PlanNode, visited: &mut VisitedNodes) -> Option<Arc<NodeSignature>> {
        if let Some(visit) = visited.visits.get(&node.id()) {
            return match visit {
                NodeVisit::Supported(signature) => Some(signature.clone()),
                NodeVisit::Unsupported => None,
            };
        }

        let mut inputs = Vec::with_capacity(node.inputs().len());
        let mut supported = true;
        for input in node.inputs() {
            match self.visit(input, visited) {
                Some(signature) => inputs.push(signature),
                None => supported = false,
            }
        }

        let result = if supported {
            self.build_signature(node, inputs)
        } else {
            None
        };

        let visit = match &result {
            Some(signature) => NodeVisit::Supported(signature.clone()),
            None => NodeVisit::Unsupported,
        };
        visited.visits.insert(node.id(), visit);
        result
    }

    fn build_signature(
        &self,
        node: &PlanNode,
        inputs: Vec<Arc<NodeSignature>>,
    ) -> Option<Arc<NodeSignature>> {
        let join_quals = match node.op() {
            PlanOp::LeftDeepJoin => Some(self.join_quals_for(node)),
            _ => None,
        };

        let heavy_in_list = node
            .op()
            .expressions()
            .into_iter()
            .chain(
                join_quals
                    .iter()
                    .flat_map(|levels| levels.iter().flat_map(|level| level.quals.iter())),
            )
            .any(is_unsupported_expr);
        if heavy_in_list {
            log::debug!(
                "节点 {} 含有超过 {} 个元素的 IN 列表",
                node.id(),
                MAX_IN_LIST_SIZE_FOR_DAG
            );
            return None;
        }

        let params = match node.op() {
            PlanOp::Scan { table } => match self.schema_provider.table_info(*table) {
                Some(info) => format!("{}:{}", table, info.name),
                None => {
                    log::warn!("扫描节点 {} 引用了未知的表 {}", node.id(), table);
                    return None;
                }
            },
            PlanOp::Project { exprs } => self.translator.translate_list(exprs),
            PlanOp::Filter { condition } => self.translator.translate(condition),
            PlanOp::Aggregate {
                group_key_count,
                aggregates,
            } => format!(
                "groups={} aggs={}",
                group_key_count,
                self.translator.translate_list(aggregates)
            ),
            PlanOp::Sort {
                keys,
                limit,
                offset,
            } => format!(
                "keys={} limit={} offset={}",
                sort_keys_text(keys),
                limit.map_or_else(|| "none".to_string(), |l| l.to_string()),
                offset
            ),
            PlanOp::Join {
                join_type,
                condition,
            } => format!("{} {}", join_type, self.translator.translate(condition)),
            PlanOp::LeftDeepJoin => {
                let levels = join_quals.unwrap_or_default();
                self.join_quals_text(&levels)
            }
            PlanOp::Compound {
                filter,
                group_key_count,
                targets,
            } => format!(
                "filter={} groups={} targets={}",
                filter
                    .as_ref()
                    .map_or_else(|| "none".to_string(), |f| self.translator.translate(f)),
                group_key_count,
                self.translator.translate_list(targets)
            ),
            PlanOp::Union { all } => (if *all { "ALL" } else { "DISTINCT" }).to_string(),
        };

        Some(NodeSignature::new(node.kind(), params, inputs))
    }

    fn join_quals_for(&self, node: &PlanNode) -> JoinQualsPerNestingLevel {
        let tree_id = self.join_tree_id.unwrap_or_else(|| {
            panic!("左深连接节点 {} 需要连接树ID，但提取时未提供", node.id())
        });
        let levels = self.join_tree_info.get(&tree_id).unwrap_or_else(|| {
            panic!("连接树 {} 没有连接条件信息", tree_id)
        });
        assert_eq!(
            levels.len() + 1,
            node.inputs().len(),
            "连接树 {} 的嵌套层数与左深连接节点 {} 的输入数不符",
            tree_id,
            node.id()
        );
        levels.clone()
    }

    fn join_quals_text(&self, levels: &JoinQualsPerNestingLevel) -> String {
        let mut text = String::new();
        for (level, condition) in levels.iter().enumerate() {
            if level > 0 {
                text.push(';');
            }
            let _ = write!(
                text,
                "L{}:{}{}",
                level,
                condition.join_type,
                self.translator.translate_list(&condition.quals)
            );
        }
        text
    }
}

fn sort_keys_text(keys: &[SortField]) -> String {
    let mut text = String::from("[");
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            text.push_str(", ");
        }
        let direction = match key.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        let nulls = if key.nulls_first { "FIRST" } else { "LAST" };
        let _ = write!(text, "${} {} NULLS {}", key.column, direction, nulls);
    }
    text.push(']');
    text
}

fn collect_pre_order(signature: &Arc<NodeSignature>, out: &mut Vec<Arc<NodeSignature>>) {
    out.push(signature.clone());
    for input in signature.inputs() {
        collect_pre_order(input, out);
    }
}

/// 判断表达式是否会让计划失去缓存资格
pub fn is_unsupported_expr(expr: &Expr) -> bool {
    expr.max_in_list_len() > MAX_IN_LIST_SIZE_FOR_DAG
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::plan::{
        InMemorySchemaProvider, JoinCondition, Literal, RelAlgTranslator, TableInfo, TableRef,
    };

    struct Fixture {
        schema: InMemorySchemaProvider,
        translator: RelAlgTranslator,
        executor: ExecutorContext,
        t1: TableRef,
        t2: TableRef,
    }

    impl Fixture {
        fn new() -> Self {
            let schema = InMemorySchemaProvider::new();
            let t1 = TableRef::new(1, 1);
            let t2 = TableRef::new(1, 2);
            schema.add_table(TableInfo::new(t1, "t1", vec!["x".into(), "y".into()]));
            schema.add_table(TableInfo::new(t2, "t2", vec!["x".into(), "y".into()]));
            Self {
                schema,
                translator: RelAlgTranslator::new(),
                executor: ExecutorContext::new(&Config::default()),
                t1,
                t2,
            }
        }

        fn extract(&self, root: &PlanNode) -> ExtractedPlanDag {
            self.extract_with(root, None, &JoinTreeInfo::new())
        }

        fn extract_with(
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
    }

    #[test]
    fn test_pre_order_numbering() {
        let fx = Fixture::new();
        let scan = PlanNode::scan(fx.t1);
        let project = PlanNode::project(vec![Expr::col(0)], scan);
        let sort = PlanNode::sort(vec![SortField::asc(0)], project.clone());

        let dag = fx.extract(&sort);
        assert_eq!(dag.extracted_dag, "0|1|2|");
        assert_eq!(dag.node_ids, vec![0, 1, 2]);
        assert!(!dag.contains_unsupported_node);

        // 去掉排序节点后复用已有的投影与扫描节点
        assert_eq!(fx.extract(&project).extracted_dag, "1|2|");
    }

    #[test]
    fn test_unknown_table_is_unsupported() {
        let fx = Fixture::new();
        let scan = PlanNode::scan(TableRef::new(9, 9));
        let dag = fx.extract(&scan);
        assert!(dag.contains_unsupported_node);
        assert!(!dag.is_cacheable());
        assert_eq!(fx.executor.dag_cache().unique_node_count(), 0);
    }

    #[test]
    fn test_heavy_in_list_inside_join_quals() {
        let fx = Fixture::new();
        let join = PlanNode::left_deep_join(vec![PlanNode::scan(fx.t1), PlanNode::scan(fx.t2)]);
        let mut info = JoinTreeInfo::new();
        info.insert(
            0,
            vec![JoinCondition::inner(vec![Expr::in_list(
                Expr::col(0),
                (0..21).map(Literal::Int).collect(),
            )])],
        );
        let dag = fx.extract_with(&join, Some(0), &info);
        assert!(dag.contains_unsupported_node);
        assert_eq!(fx.executor.dag_cache().unique_node_count(), 0);
    }

    #[test]
    #[should_panic(expected = "需要连接树ID")]
    fn test_left_deep_join_without_tree_id_panics() {
        let fx = Fixture::new();
        let join = PlanNode::left_deep_join(vec![PlanNode::scan(fx.t1), PlanNode::scan(fx.t2)]);
        fx.extract(&join);
    }

    #[test]
    fn test_visited_nodes_memoize_signatures() {
        let fx = Fixture::new();
        let scan = PlanNode::scan(fx.t1);
        let filter = PlanNode::filter(Expr::lt(Expr::col(0), Expr::int(3)), scan.clone());
        let mut visited = VisitedNodes::new();

        let first = QueryPlanDagExtractor::extract_query_plan_dag(
            &filter,
            &fx.schema,
            None,
            &JoinTreeInfo::new(),
            &mut visited,
            &fx.executor,
            &fx.translator,
        );
        assert_eq!(visited.len(), 2);
        assert!(visited.contains(scan.id()));

        // 表被删除后，记录中的签名仍然有效
        fx.schema.drop_table(fx.t1);
        let second = QueryPlanDagExtractor::extract_query_plan_dag(
            &filter,
            &fx.schema,
            None,
            &JoinTreeInfo::new(),
            &mut visited,
            &fx.executor,
            &fx.translator,
        );
        assert_eq!(first, second);
    }

    #[test]
    fn test_sort_keys_text() {
        let text = sort_keys_text(&[SortField::asc(0), SortField::desc(2)]);
        assert_eq!(text, "[$0 ASC NULLS LAST, $2 DESC NULLS LAST]");
    }

    #[test]
    fn test_is_unsupported_expr_threshold() {
        let at_limit = Expr::in_list(Expr::col(0), (0..20).map(Literal::Int).collect());
        let over_limit = Expr::in_list(Expr::col(0), (0..21).map(Literal::Int).collect());
        assert!(!is_unsupported_expr(&at_limit));
        assert!(is_unsupported_expr(&over_limit));
    }
}
