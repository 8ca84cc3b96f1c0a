//! Name resolution and arity checking.
//!
//! Turns a parsed [`Expr`] into a [`ValidatedAst`] in which every call
//! carries its resolved [`Function`] and every identifier its [`ContextVar`].

use super::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use super::builtins::{self, ContextVar, Function};
use super::error::SemanticError;

/// A checked expression node. Same shape as [`Expr`], names resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Checked {
    pub kind: CheckedKind,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckedKind {
    Number(f64),
    Context(ContextVar),
    Call {
        function: Function,
        name: String,
        args: Vec<Checked>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Checked>,
        right: Box<Checked>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Checked>,
    },
}

/// The output of [`validate`]: a tree guaranteed to name only known
/// functions and context variables, each called with the right arity.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedAst {
    pub root: Checked,
}

pub fn validate(expr: &Expr) -> Result<ValidatedAst, SemanticError> {
    Ok(ValidatedAst {
        root: check(expr)?,
    })
}

fn check(expr: &Expr) -> Result<Checked, SemanticError> {
    let kind = match &expr.kind {
        ExprKind::Number(v) => CheckedKind::Number(*v),
        ExprKind::Identifier(name) => match builtins::lookup_context(name) {
            Some(var) => CheckedKind::Context(var),
            None => {
                return Err(SemanticError::UnknownIdentifier {
                    name: name.clone(),
                    offset: expr.offset,
                })
            }
        },
        ExprKind::Call { callee, args } => {
            let builtin = builtins::lookup(callee).ok_or_else(|| SemanticError::UnknownFunction {
                name: callee.clone(),
                offset: expr.offset,
            })?;
            if args.len() != builtin.arity {
                return Err(SemanticError::ArityError {
                    name: callee.clone(),
                    expected: builtin.arity,
                    got: args.len(),
                    offset: expr.offset,
                });
            }
            CheckedKind::Call {
                function: builtin.function,
                name: callee.clone(),
                args: args.iter().map(check).collect::<Result<_, _>>()?,
            }
        }
        ExprKind::Binary { op, left, right } => CheckedKind::Binary {
            op: *op,
            left: Box::new(check(left)?),
            right: Box::new(check(right)?),
        },
        ExprKind::Unary { op, operand } => CheckedKind::Unary {
            op: *op,
            operand: Box::new(check(operand)?),
        },
    };
    Ok(Checked {
        kind,
        offset: expr.offset,
    })
}
