//! Errors surfaced to the user for a failed run.

use std::fmt;

use thiserror::Error;

use crate::dsl::error::{arity_message, SemanticError, SyntaxError};
use crate::graph::BuildError;

/// Which pipeline step rejected the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lexer,
    Parser,
    Validator,
    Builder,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Lexer => "lexer",
            Stage::Parser => "parser",
            Stage::Validator => "validator",
            Stage::Builder => "builder",
        })
    }
}

/// A terminal error for one run: stage, byte offset into the source, message.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{stage} error at offset {offset}: {message}")]
pub struct PipelineError {
    pub stage: Stage,
    pub offset: usize,
    pub message: String,
}

impl PipelineError {
    pub fn new(stage: Stage, offset: usize, message: impl Into<String>) -> Self {
        Self {
            stage,
            offset,
            message: message.into(),
        }
    }

    /// 1-based line and column of the offset within `source`.
    ///
    /// Columns count characters, not bytes. Offsets past the end (or inside a
    /// multi-byte character) are clamped to the nearest preceding boundary.
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        let mut end = self.offset.min(source.len());
        while !source.is_char_boundary(end) {
            end -= 1;
        }
        let before = &source[..end];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let col = before[line_start..].chars().count() + 1;
        (line, col)
    }

    /// `"<stage> error at <line>:<col>: <message>"`.
    pub fn describe(&self, source: &str) -> String {
        let (line, col) = self.line_col(source);
        format!("{} error at {line}:{col}: {}", self.stage, self.message)
    }
}

impl From<SyntaxError> for PipelineError {
    fn from(e: SyntaxError) -> Self {
        let stage = if e.lexical { Stage::Lexer } else { Stage::Parser };
        Self::new(stage, e.offset, e.message)
    }
}

impl From<SemanticError> for PipelineError {
    fn from(e: SemanticError) -> Self {
        let message = match &e {
            SemanticError::UnknownFunction { name, .. } => format!("unknown function '{name}'"),
            SemanticError::UnknownIdentifier { name, .. } => format!("unknown identifier '{name}'"),
            SemanticError::ArityError {
                name,
                expected,
                got,
                ..
            } => arity_message(name, expected, got),
        };
        Self::new(Stage::Validator, e.offset(), message)
    }
}

impl From<BuildError> for PipelineError {
    fn from(e: BuildError) -> Self {
        Self::new(Stage::Builder, e.offset().unwrap_or(0), e.to_string())
    }
}
