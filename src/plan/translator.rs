//! 表达式翻译器
//!
//! 把计划表达式翻译成规范文本，作为节点签名中的算子参数。
//! 翻译保持表达式原有的操作数顺序与合取项顺序，不做交换律归一化。

use std::fmt::Write;

use super::expr::{Expr, Literal};

/// 表达式翻译器特征
pub trait ExpressionTranslator: Send + Sync {
    /// 翻译单个表达式
    fn translate(&self, expr: &Expr) -> String;

    /// 翻译表达式列表，保持顺序
    fn translate_list(&self, exprs: &[Expr]) -> String {
        let mut out = String::from("[");
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&self.translate(expr));
        }
        out.push(']');
        out
    }
}

/// 默认的关系代数表达式翻译器
#[derive(Debug, Default, Clone)]
pub struct RelAlgTranslator;

impl RelAlgTranslator {
    pub fn new() -> Self {
        Self
    }

    fn write_expr(&self, out: &mut String, expr: &Expr) {
        match expr {
            Expr::Column(index) => {
                let _ = write!(out, "${}", index);
            }
            Expr::Literal(literal) => {
                let _ = write!(out, "{}", literal);
            }
            Expr::Binary { op, left, right } => {
                out.push('(');
                self.write_expr(out, left);
                let _ = write!(out, " {} ", op.name());
                self.write_expr(out, right);
                out.push(')');
            }
            Expr::Unary { op, operand } => {
                let _ = write!(out, "{}(", op.name());
                self.write_expr(out, operand);
                out.push(')');
            }
            Expr::InList {
                arg,
                values,
                negated,
            } => {
                self.write_expr(out, arg);
                out.push_str(if *negated { " NOT IN (" } else { " IN (" });
                self.write_literals(out, values);
                out.push(')');
            }
            Expr::Function { name, args } => {
                let _ = write!(out, "{}(", name.to_uppercase());
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_expr(out, arg);
                }
                out.push(')');
            }
            Expr::Aggregate {
                func,
                arg,
                distinct,
            } => {
                let _ = write!(out, "{}(", func.name());
                if *distinct {
                    out.push_str("DISTINCT ");
                }
                match arg {
                    Some(arg) => self.write_expr(out, arg),
                    None => out.push('*'),
                }
                out.push(')');
            }
        }
    }

    fn write_literals(&self, out: &mut String, values: &[Literal]) {
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{}", value);
        }
    }
}

impl ExpressionTranslator for RelAlgTranslator {
    fn translate(&self, expr: &Expr) -> String {
        let mut out = String::new();
        self.write_expr(&mut out, expr);
        out
    }
}
