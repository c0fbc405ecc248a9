//! 计划表达式
//!
//! 关系代数计划节点携带的谓词、投影与聚合表达式。列引用使用输入列的
//! 序号（多输入节点按输入顺序拼接），与具体列名无关。

use std::fmt;

/// 字面量
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "NULL"),
            Literal::Bool(v) => write!(f, "{}:bool", v),
            Literal::Int(v) => write!(f, "{}:int", v),
            Literal::Double(v) => write!(f, "{:?}:double", v),
            Literal::String(v) => write!(f, "{:?}:str", v),
        }
    }
}

/// 二元操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOperator {
    pub fn name(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::Ne => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
        }
    }
}

/// 一元操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Not,
    Neg,
    IsNull,
    IsNotNull,
}

impl UnaryOperator {
    pub fn name(&self) -> &'static str {
        match self {
            UnaryOperator::Not => "NOT",
            UnaryOperator::Neg => "-",
            UnaryOperator::IsNull => "IS NULL",
            UnaryOperator::IsNotNull => "IS NOT NULL",
        }
    }
}

/// 聚合函数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
        }
    }
}

/// 计划表达式
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// 输入列引用
    Column(usize),
    Literal(Literal),
    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    /// `arg [NOT] IN (v1, v2, ...)`
    InList {
        arg: Box<Expr>,
        values: Vec<Literal>,
        negated: bool,
    },
    Function {
        name: String,
        args: Vec<Expr>,
    },
    Aggregate {
        func: AggregateFunction,
        arg: Option<Box<Expr>>,
        distinct: bool,
    },
}

impl Expr {
    pub fn col(index: usize) -> Self {
        Expr::Column(index)
    }

    pub fn int(value: i64) -> Self {
        Expr::Literal(Literal::Int(value))
    }

    pub fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn eq(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOperator::Eq, left, right)
    }

    pub fn lt(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOperator::Lt, left, right)
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOperator::And, left, right)
    }

    pub fn in_list(arg: Expr, values: Vec<Literal>) -> Self {
        Expr::InList {
            arg: Box::new(arg),
            values,
            negated: false,
        }
    }

    pub fn count(arg: Option<Expr>) -> Self {
        Expr::Aggregate {
            func: AggregateFunction::Count,
            arg: arg.map(Box::new),
            distinct: false,
        }
    }

    /// 先序遍历表达式树
    pub fn walk<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a Expr),
    {
        f(self);
        match self {
            Expr::Column(_) | Expr::Literal(_) => {}
            Expr::Binary { left, right, .. } => {
                left.walk(f);
                right.walk(f);
            }
            Expr::Unary { operand, .. } => operand.walk(f),
            Expr::InList { arg, .. } => arg.walk(f),
            Expr::Function { args, .. } => {
                for arg in args {
                    arg.walk(f);
                }
            }
            Expr::Aggregate { arg, .. } => {
                if let Some(arg) = arg {
                    arg.walk(f);
                }
            }
        }
    }

    /// 表达式树中最长 IN 列表的长度，没有 IN 表达式时为 0
    pub fn max_in_list_len(&self) -> usize {
        let mut max = 0;
        self.walk(&mut |expr| {
            if let Expr::InList { values, .. } = expr {
                max = max.max(values.len());
            }
        });
        max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_in_list_len_nested() {
        let small = Expr::in_list(Expr::col(0), (0..3).map(Literal::Int).collect());
        let large = Expr::in_list(Expr::col(1), (0..7).map(Literal::Int).collect());
        let expr = Expr::and(small, Expr::Unary {
            op: UnaryOperator::Not,
            operand: Box::new(large),
        });
        assert_eq!(expr.max_in_list_len(), 7);
        assert_eq!(Expr::col(0).max_in_list_len(), 0);
    }

    #[test]
    fn test_literal_display_is_typed() {
        assert_eq!(Literal::Int(1).to_string(), "1:int");
        assert_eq!(Literal::String("1".into()).to_string(), "\"1\":str");
        assert_ne!(Literal::Int(1).to_string(), Literal::Double(1.0).to_string());
    }
}
