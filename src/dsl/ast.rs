//! Abstract Syntax Tree for SAPF expressions.
//!
//! A program is a single expression. Every node records the byte offset of
//! the token that introduced it so later stages can point at it.

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Number(f64),
    /// A bare reserved identifier such as `time`.
    Identifier(String),
    Call {
        callee: String,
        args: Vec<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
}

impl Expr {
    pub fn new(kind: ExprKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}
