//! 左深连接树信息
//!
//! 规划器把多表内连接整理为左深连接树，每一层嵌套对应一个连接条件列表。
//! 条件列表保持原始顺序，DAG 提取据此区分连接。

use std::collections::HashMap;
use std::fmt;

use super::expr::Expr;

/// 左深连接树ID
pub type JoinTreeId = u32;

/// 连接类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    Inner,
    Left,
    Semi,
    Anti,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Semi => "SEMI",
            JoinType::Anti => "ANTI",
        };
        f.write_str(name)
    }
}

/// 一层嵌套上的连接条件，`quals` 为按原始顺序排列的合取项
#[derive(Debug, Clone, PartialEq)]
pub struct JoinCondition {
    pub join_type: JoinType,
    pub quals: Vec<Expr>,
}

impl JoinCondition {
    pub fn inner(quals: Vec<Expr>) -> Self {
        Self {
            join_type: JoinType::Inner,
            quals,
        }
    }
}

/// 每层嵌套的连接条件
pub type JoinQualsPerNestingLevel = Vec<JoinCondition>;

/// 查询中所有左深连接树的连接条件
pub type JoinTreeInfo = HashMap<JoinTreeId, JoinQualsPerNestingLevel>;
