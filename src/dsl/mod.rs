//! SAPF front end: source text → tokens → AST → validated AST → signal graph.

pub mod ast;
pub mod builtins;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod validate;

pub use ast::{BinaryOp, Expr, ExprKind, UnaryOp};
pub use builtins::{Builtin, Category, ContextVar, Function, BUILTINS};
pub use error::{SemanticError, SyntaxError};
pub use lexer::tokenize;
pub use parser::parse;
pub use token::{Token, TokenKind};
pub use validate::{validate, ValidatedAst};

use crate::error::PipelineError;
use crate::graph::build::{DEFAULT_MAX_DELAY_SECONDS, DEFAULT_SEED};
use crate::graph::{GraphBuilder, SignalGraph};

/// The SAPF compiler.
///
/// Runs source text through every stage and reports the first failure as a
/// [`PipelineError`] tagged with its stage.
#[derive(Debug, Clone)]
pub struct Compiler {
    sample_rate: f64,
    seed: u64,
    max_delay: f64,
}

impl Compiler {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            seed: DEFAULT_SEED,
            max_delay: DEFAULT_MAX_DELAY_SECONDS,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_delay(mut self, seconds: f64) -> Self {
        self.max_delay = seconds;
        self
    }

    /// Tokenize and parse `source` into an AST.
    pub fn parse(source: &str) -> Result<Expr, PipelineError> {
        Ok(parse(tokenize(source))?)
    }

    /// Parse and validate `source` without building anything.
    pub fn check(source: &str) -> Result<ValidatedAst, PipelineError> {
        let expr = Self::parse(source)?;
        Ok(validate(&expr)?)
    }

    /// Run the full pipeline and return a graph ready to render.
    pub fn compile(&self, source: &str) -> Result<SignalGraph, PipelineError> {
        let ast = Self::check(source)?;
        let graph = GraphBuilder::new(self.sample_rate)
            .with_seed(self.seed)
            .with_max_delay(self.max_delay)
            .build(&ast)?;
        Ok(graph)
    }
}

/// Compile `source` at `sample_rate`, seeding stochastic nodes from `seed`.
pub fn compile(source: &str, sample_rate: f64, seed: u64) -> Result<SignalGraph, PipelineError> {
    Compiler::new(sample_rate).with_seed(seed).compile(source)
}
