//! 自定义断言辅助模块
//!
//! 提供测试中的常用断言函数

use datarecycler::dag::ExtractedPlanDag;

/// 断言结果成功，返回内部值
pub fn assert_ok<T, E: std::fmt::Debug>(result: Result<T, E>) -> T {
    result.expect("操作应该成功")
}

/// 断言结果失败并匹配错误消息
pub fn assert_err_with<T: std::fmt::Debug, E: std::fmt::Display>(result: Result<T, E>, expected_msg: &str) {
    let err = result.expect_err("操作应该失败");
    let err_str = err.to_string();
    assert!(
        err_str.contains(expected_msg),
        "错误消息应包含 '{}', 实际是 '{}'",
        expected_msg,
        err_str
    );
}

/// 断言 DAG 字符串
pub fn assert_dag(dag: &ExtractedPlanDag, expected: &str) {
    assert_eq!(
        dag.extracted_dag, expected,
        "DAG 不匹配: 期望 '{}', 实际 '{}'",
        expected, dag.extracted_dag
    );
    assert!(!dag.contains_unsupported_node, "DAG 不应含有不支持的节点");
}

/// 断言 DAG 因不支持的节点而为空
pub fn assert_unsupported(dag: &ExtractedPlanDag) {
    assert!(dag.contains_unsupported_node, "DAG 应含有不支持的节点");
    assert!(dag.extracted_dag.is_empty(), "不支持的计划不应产生 DAG");
}
