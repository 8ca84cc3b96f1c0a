//! Error types for the SAPF front end.

use thiserror::Error;

/// A malformed token stream: unexpected token, unmatched parenthesis,
/// trailing tokens, empty input, or a token the lexer marked invalid.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("syntax error at offset {offset}: {message}")]
pub struct SyntaxError {
    pub offset: usize,
    pub message: String,
    /// Set when the offending token came out of the lexer as `Invalid`.
    pub lexical: bool,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            offset,
            message: message.into(),
            lexical: false,
        }
    }

    pub fn lexical(message: impl Into<String>, offset: usize) -> Self {
        Self {
            offset,
            message: message.into(),
            lexical: true,
        }
    }
}

/// A well-formed expression that refers to something the language does not have.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SemanticError {
    #[error("unknown function '{name}' at offset {offset}")]
    UnknownFunction { name: String, offset: usize },

    #[error("unknown identifier '{name}' at offset {offset}")]
    UnknownIdentifier { name: String, offset: usize },

    #[error("{} (offset {offset})", arity_message(.name, .expected, .got))]
    ArityError {
        name: String,
        expected: usize,
        got: usize,
        offset: usize,
    },
}

impl SemanticError {
    pub fn offset(&self) -> usize {
        match self {
            SemanticError::UnknownFunction { offset, .. }
            | SemanticError::UnknownIdentifier { offset, .. }
            | SemanticError::ArityError { offset, .. } => *offset,
        }
    }
}

/// `"'sine' expects 1 argument, got 2"`, shared by every arity report.
pub(crate) fn arity_message(name: &str, expected: &usize, got: &usize) -> String {
    let plural = if *expected == 1 { "" } else { "s" };
    format!("'{name}' expects {expected} argument{plural}, got {got}")
}
