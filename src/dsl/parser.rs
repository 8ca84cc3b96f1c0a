//! Parser for SAPF expressions.
//!
//! Recursive descent over the token stream, lowest precedence first:
//!
//! ```text
//! expr           := additive
//! additive       := multiplicative (("+" | "-") multiplicative)*
//! multiplicative := unary (("*" | "/") unary)*
//! unary          := "-" unary | primary
//! primary        := NUMBER | "(" expr ")" | IDENT "(" args? ")" | "time"
//! args           := expr ("," expr)*
//! ```
//!
//! The parser only enforces shape. Whether a callee exists, and how many
//! arguments it takes, is the validator's concern.

use super::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use super::error::SyntaxError;
use super::token::{Operator, Token, TokenKind};

/// Bare identifiers that parse without a call: nullary context values.
pub const RESERVED_IDENTIFIERS: &[&str] = &["time"];

/// Nesting beyond this is rejected instead of risking the stack.
const MAX_DEPTH: usize = 256;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    /// Offsets of the currently unclosed `(` tokens, innermost last.
    open_parens: Vec<usize>,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map_or(true, |t| t.kind != TokenKind::Eof) {
            let offset = tokens.last().map_or(0, |t| t.offset + t.text.len());
            tokens.push(Token {
                kind: TokenKind::Eof,
                text: String::new(),
                offset,
            });
        }
        Self {
            tokens,
            pos: 0,
            depth: 0,
            open_parens: Vec::new(),
        }
    }

    /// Parse exactly one expression followed by end of input.
    pub fn parse(&mut self) -> Result<Expr, SyntaxError> {
        if self.peek().kind == TokenKind::Eof {
            return Err(SyntaxError::new("empty input", 0));
        }

        let expr = self.parse_expr()?;

        let t = self.peek();
        match &t.kind {
            TokenKind::Eof => Ok(expr),
            TokenKind::Invalid(issue) => Err(SyntaxError::lexical(issue.to_string(), t.offset)),
            TokenKind::RParen => Err(SyntaxError::new("unmatched ')'", t.offset)),
            other => Err(SyntaxError::new(
                format!("unexpected {other} after complete expression"),
                t.offset,
            )),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, SyntaxError> {
        let offset = self.peek().offset;
        self.descend(offset)?;
        let result = self.parse_additive();
        self.depth -= 1;
        result
    }

    /// Enter one more level of the tree being built.
    fn descend(&mut self, offset: usize) -> Result<(), SyntaxError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(SyntaxError::new("expression nested too deeply", offset));
        }
        Ok(())
    }

    fn parse_additive(&mut self) -> Result<Expr, SyntaxError> {
        let base = self.depth;
        let result = self.additive_chain();
        self.depth = base;
        result
    }

    /// Each operator in a left-associative chain adds a level to the tree.
    fn additive_chain(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Operator(Operator::Plus) => BinaryOp::Add,
                TokenKind::Operator(Operator::Minus) => BinaryOp::Sub,
                _ => break,
            };
            let offset = self.advance().offset;
            self.descend(offset)?;
            let right = self.parse_multiplicative()?;
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                offset,
            );
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        let base = self.depth;
        let result = self.multiplicative_chain();
        self.depth = base;
        result
    }

    /// Each operator in a left-associative chain adds a level to the tree.
    fn multiplicative_chain(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Operator(Operator::Star) => BinaryOp::Mul,
                TokenKind::Operator(Operator::Slash) => BinaryOp::Div,
                _ => break,
            };
            let offset = self.advance().offset;
            self.descend(offset)?;
            let right = self.parse_unary()?;
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                offset,
            );
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        if self.peek().kind == TokenKind::Operator(Operator::Minus) {
            let offset = self.advance().offset;
            self.descend(offset)?;
            let operand = self.parse_unary();
            self.depth -= 1;
            return Ok(Expr::new(
                ExprKind::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand?),
                },
                offset,
            ));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        let t = self.peek().clone();
        match &t.kind {
            TokenKind::Number(value) => {
                self.advance();
                Ok(Expr::new(ExprKind::Number(*value), t.offset))
            }
            TokenKind::LParen => {
                self.advance();
                self.open_parens.push(t.offset);
                let inner = self.parse_expr()?;
                self.expect_close()?;
                Ok(inner)
            }
            TokenKind::Identifier => {
                self.advance();
                if self.peek().kind == TokenKind::LParen {
                    self.parse_call(t.text, t.offset)
                } else if RESERVED_IDENTIFIERS.contains(&t.text.as_str()) {
                    Ok(Expr::new(ExprKind::Identifier(t.text), t.offset))
                } else {
                    Err(SyntaxError::new(
                        format!("expected '(' after '{}'", t.text),
                        t.offset,
                    ))
                }
            }
            TokenKind::Str(_) => Err(SyntaxError::new(
                "string literals are not supported in expressions",
                t.offset,
            )),
            TokenKind::Invalid(issue) => Err(SyntaxError::lexical(issue.to_string(), t.offset)),
            TokenKind::Eof => Err(self.eof_error(t.offset)),
            other => Err(SyntaxError::new(format!("unexpected {other}"), t.offset)),
        }
    }

    /// Parse the argument list of a call; the callee has been consumed and
    /// the current token is `(`.
    fn parse_call(&mut self, callee: String, offset: usize) -> Result<Expr, SyntaxError> {
        let lparen = self.advance().offset;
        self.open_parens.push(lparen);

        let mut args = Vec::new();
        if self.peek().kind == TokenKind::RParen {
            self.advance();
            self.open_parens.pop();
            return Ok(Expr::new(ExprKind::Call { callee, args }, offset));
        }

        loop {
            args.push(self.parse_expr()?);
            if self.peek().kind == TokenKind::Comma {
                self.advance();
                continue;
            }
            self.expect_close()?;
            break;
        }

        Ok(Expr::new(ExprKind::Call { callee, args }, offset))
    }

    /// Consume the `)` matching the innermost open parenthesis.
    fn expect_close(&mut self) -> Result<(), SyntaxError> {
        let t = self.peek();
        match &t.kind {
            TokenKind::RParen => {
                self.advance();
                self.open_parens.pop();
                Ok(())
            }
            TokenKind::Eof => Err(self.eof_error(t.offset)),
            TokenKind::Invalid(issue) => Err(SyntaxError::lexical(issue.to_string(), t.offset)),
            other => Err(SyntaxError::new(
                format!("expected ',' or ')', got {other}"),
                t.offset,
            )),
        }
    }

    fn eof_error(&self, eof_offset: usize) -> SyntaxError {
        match self.open_parens.last() {
            Some(&open) => SyntaxError::new("unmatched '('", open),
            None => SyntaxError::new("unexpected end of input", eof_offset),
        }
    }

    // --- Utility methods ---

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> &Token {
        let t = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        t
    }
}

/// Parse a token sequence into a single expression.
pub fn parse(tokens: Vec<Token>) -> Result<Expr, SyntaxError> {
    Parser::new(tokens).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::lexer::tokenize;

    fn parse_src(src: &str) -> Result<Expr, SyntaxError> {
        parse(tokenize(src))
    }

    fn number(e: &Expr) -> f64 {
        match e.kind {
            ExprKind::Number(v) => v,
            ref other => panic!("expected number, got {other:?}"),
        }
    }

    #[test]
    fn parse_number() {
        let e = parse_src("440").unwrap();
        assert_eq!(number(&e), 440.0);
        assert_eq!(e.offset, 0);
    }

    #[test]
    fn parse_call_with_args() {
        let e = parse_src("ramp(0, 1, 2)").unwrap();
        match e.kind {
            ExprKind::Call { callee, args } => {
                assert_eq!(callee, "ramp");
                assert_eq!(args.len(), 3);
                assert_eq!(number(&args[2]), 2.0);
                assert_eq!(args[1].offset, 8);
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn parse_empty_call() {
        let e = parse_src("noise()").unwrap();
        assert!(matches!(e.kind, ExprKind::Call { ref args, .. } if args.is_empty()));
    }

    #[test]
    fn multiplication_binds_tighter() {
        let e = parse_src("1 + 2 * 3").unwrap();
        match e.kind {
            ExprKind::Binary { op, left, right } => {
                assert_eq!(op, BinaryOp::Add);
                assert_eq!(number(&left), 1.0);
                assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("expected binary, got {other:?}"),
        }
    }

    #[test]
    fn subtraction_is_left_associative() {
        // (8 - 4) - 2
        let e = parse_src("8 - 4 - 2").unwrap();
        match e.kind {
            ExprKind::Binary { op, left, right } => {
                assert_eq!(op, BinaryOp::Sub);
                assert_eq!(number(&right), 2.0);
                assert!(matches!(left.kind, ExprKind::Binary { op: BinaryOp::Sub, .. }));
            }
            other => panic!("expected binary, got {other:?}"),
        }
    }

    #[test]
    fn division_is_left_associative() {
        let e = parse_src("8 / 4 / 2").unwrap();
        match e.kind {
            ExprKind::Binary { left, right, .. } => {
                assert_eq!(number(&right), 2.0);
                assert!(matches!(left.kind, ExprKind::Binary { op: BinaryOp::Div, .. }));
            }
            other => panic!("expected binary, got {other:?}"),
        }
    }

    #[test]
    fn unary_minus_binds_tighter_than_multiplication() {
        let e = parse_src("-2 * 3").unwrap();
        match e.kind {
            ExprKind::Binary { op, left, .. } => {
                assert_eq!(op, BinaryOp::Mul);
                assert!(matches!(left.kind, ExprKind::Unary { op: UnaryOp::Neg, .. }));
            }
            other => panic!("expected binary, got {other:?}"),
        }
    }

    #[test]
    fn double_negation() {
        let e = parse_src("--1").unwrap();
        match e.kind {
            ExprKind::Unary { operand, .. } => {
                assert!(matches!(operand.kind, ExprKind::Unary { .. }));
            }
            other => panic!("expected unary, got {other:?}"),
        }
    }

    #[test]
    fn parentheses_override_precedence() {
        let e = parse_src("(1 + 2) * 3").unwrap();
        assert!(matches!(e.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn parse_nested_modulation() {
        let e = parse_src("sine(440 + sine(5) * 10) * 0.5").unwrap();
        let ExprKind::Binary { op: BinaryOp::Mul, left, right } = e.kind else {
            panic!("expected product at the root");
        };
        assert_eq!(number(&right), 0.5);
        let ExprKind::Call { callee, args } = left.kind else {
            panic!("expected call on the left");
        };
        assert_eq!(callee, "sine");
        assert!(matches!(
            args[0].kind,
            ExprKind::Binary { op: BinaryOp::Add, .. }
        ));
    }

    #[test]
    fn parse_time_identifier() {
        let e = parse_src("sine(time * 100)").unwrap();
        match e.kind {
            ExprKind::Call { args, .. } => match &args[0].kind {
                ExprKind::Binary { left, .. } => {
                    assert_eq!(left.kind, ExprKind::Identifier("time".to_string()));
                }
                other => panic!("expected binary, got {other:?}"),
            },
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn bare_identifier_is_rejected() {
        let err = parse_src("1 + foo").unwrap_err();
        assert_eq!(err.offset, 4);
        assert!(err.message.contains("foo"));
    }

    #[test]
    fn parser_does_not_check_names() {
        assert!(parse_src("foo(1, 2)").is_ok());
    }

    #[test]
    fn error_empty_input() {
        let err = parse_src("").unwrap_err();
        assert_eq!(err.offset, 0);
        assert_eq!(err.message, "empty input");

        let err = parse_src("  // just a comment").unwrap_err();
        assert_eq!(err.message, "empty input");
    }

    #[test]
    fn error_unclosed_call() {
        let err = parse_src("sine(").unwrap_err();
        assert_eq!(err.offset, 4);
        assert_eq!(err.message, "unmatched '('");
    }

    #[test]
    fn error_unclosed_group_points_at_innermost() {
        let err = parse_src("(1 + sine(2)").unwrap_err();
        assert_eq!(err.offset, 0);

        let err = parse_src("(sine(2 + 1").unwrap_err();
        assert_eq!(err.offset, 5);
    }

    #[test]
    fn error_unmatched_close() {
        let err = parse_src("sine(1))").unwrap_err();
        assert_eq!(err.offset, 7);
        assert_eq!(err.message, "unmatched ')'");
    }

    #[test]
    fn error_trailing_tokens() {
        let err = parse_src("1 2").unwrap_err();
        assert_eq!(err.offset, 2);
    }

    #[test]
    fn error_missing_operand() {
        let err = parse_src("1 +").unwrap_err();
        assert_eq!(err.offset, 3);
        assert_eq!(err.message, "unexpected end of input");
    }

    #[test]
    fn error_missing_comma() {
        let err = parse_src("min(1 2)").unwrap_err();
        assert_eq!(err.offset, 6);
    }

    #[test]
    fn error_trailing_comma() {
        let err = parse_src("min(1,)").unwrap_err();
        assert_eq!(err.offset, 6);
    }

    #[test]
    fn error_unsupported_operator() {
        let err = parse_src("1 % 2").unwrap_err();
        assert_eq!(err.offset, 2);
    }

    #[test]
    fn error_string_literal() {
        let err = parse_src("sine(\"a\")").unwrap_err();
        assert_eq!(err.offset, 5);
        assert!(!err.lexical);
    }

    #[test]
    fn error_invalid_token_is_lexical() {
        let err = parse_src("sine(4#0)").unwrap_err();
        assert_eq!(err.offset, 6);
        assert!(err.lexical);
    }

    #[test]
    fn error_unterminated_comment_at_eof() {
        let src = "sine(440) /* oops";
        let err = parse_src(src).unwrap_err();
        assert!(err.lexical);
        assert_eq!(err.offset, src.len());
    }

    #[test]
    fn error_excessive_nesting() {
        let src = format!("{}1{}", "(".repeat(400), ")".repeat(400));
        let err = parse_src(&src).unwrap_err();
        assert_eq!(err.message, "expression nested too deeply");
    }

    #[test]
    fn error_long_operator_chain() {
        let sum = vec!["1"; 5000].join(" + ");
        let err = parse_src(&sum).unwrap_err();
        assert_eq!(err.message, "expression nested too deeply");

        let product = vec!["sine(1)"; 5000].join(" * ");
        let err = parse_src(&product).unwrap_err();
        assert_eq!(err.message, "expression nested too deeply");
    }

    #[test]
    fn chain_depth_resets_between_operands() {
        // Three chains of 100 side by side stay under the limit.
        let chain = vec!["1"; 100].join(" + ");
        let src = format!("lerp({chain}, {chain}, {chain})");
        assert!(parse_src(&src).is_ok());
        assert!(parse_src(&vec!["2"; 200].join(" * ")).is_ok());
    }

    #[test]
    fn parser_without_trailing_eof() {
        let mut tokens = tokenize("1");
        tokens.pop();
        assert!(parse(tokens).is_ok());
    }
}
