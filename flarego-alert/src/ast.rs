/// A parsed, bounded alert predicate. Built only by [`crate::parser::parse`],
/// which enforces the 256-node cap during construction.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Number(f64),
    Ident(String),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    NotEq,
    Add,
    Sub,
    Mul,
    Div,
}
