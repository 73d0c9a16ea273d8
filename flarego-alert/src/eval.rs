use std::collections::HashMap;

use crate::ast::{BinaryOp, Expr, UnaryOp};

/// Evaluates `expr` against a metric map. Unknown identifiers resolve to
/// `0.0`; division by zero yields `0.0`. Boolean operators return `1.0` or
/// `0.0`; non-zero is true.
pub fn eval(expr: &Expr, metrics: &HashMap<String, f64>) -> f64 {
    match expr {
        Expr::Number(n) => *n,
        Expr::Ident(name) => metrics.get(name).copied().unwrap_or(0.0),
        Expr::Unary { op, expr } => {
            let value = eval(expr, metrics);
            match op {
                UnaryOp::Neg => -value,
                UnaryOp::Not => bool_to_f64(value == 0.0),
            }
        }
        Expr::Binary { op, lhs, rhs } => {
            let a = eval(lhs, metrics);
            let b = eval(rhs, metrics);
            match op {
                BinaryOp::Or => bool_to_f64(a != 0.0 || b != 0.0),
                BinaryOp::And => bool_to_f64(a != 0.0 && b != 0.0),
                BinaryOp::Gt => bool_to_f64(a > b),
                BinaryOp::Ge => bool_to_f64(a >= b),
                BinaryOp::Lt => bool_to_f64(a < b),
                BinaryOp::Le => bool_to_f64(a <= b),
                BinaryOp::Eq => bool_to_f64(a == b),
                BinaryOp::NotEq => bool_to_f64(a != b),
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => {
                    if b == 0.0 {
                        0.0
                    } else {
                        a / b
                    }
                }
            }
        }
    }
}

/// `eval`'s result, booleanized per the non-zero-is-true convention.
pub fn eval_bool(expr: &Expr, metrics: &HashMap<String, f64>) -> bool {
    eval(expr, metrics) != 0.0
}

fn bool_to_f64(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}
