//! Token types for the SAPF lexer.

use std::fmt;

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// The source text the token was read from (without surrounding quotes for strings).
    pub text: String,
    /// Byte offset of the token's first character.
    pub offset: usize,
}

/// The kind of token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    Str(String),
    Identifier,

    Operator(Operator),

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Dot,

    // Special
    Invalid(LexIssue),
    Eof,
}

/// Single-character operators recognized by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Plus,
    Minus,
    Star,
    Slash,
    Eq,
    Lt,
    Gt,
    Bang,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Percent,
}

impl Operator {
    pub fn from_char(ch: char) -> Option<Self> {
        let op = match ch {
            '+' => Operator::Plus,
            '-' => Operator::Minus,
            '*' => Operator::Star,
            '/' => Operator::Slash,
            '=' => Operator::Eq,
            '<' => Operator::Lt,
            '>' => Operator::Gt,
            '!' => Operator::Bang,
            '&' => Operator::Amp,
            '|' => Operator::Pipe,
            '^' => Operator::Caret,
            '~' => Operator::Tilde,
            '%' => Operator::Percent,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_char(self) -> char {
        match self {
            Operator::Plus => '+',
            Operator::Minus => '-',
            Operator::Star => '*',
            Operator::Slash => '/',
            Operator::Eq => '=',
            Operator::Lt => '<',
            Operator::Gt => '>',
            Operator::Bang => '!',
            Operator::Amp => '&',
            Operator::Pipe => '|',
            Operator::Caret => '^',
            Operator::Tilde => '~',
            Operator::Percent => '%',
        }
    }
}

/// Why the lexer could not produce a regular token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexIssue {
    UnexpectedChar(char),
    UnterminatedString,
    /// Carries the offset of the opening `/*`.
    UnterminatedComment(usize),
}

impl fmt::Display for LexIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexIssue::UnexpectedChar(ch) => write!(f, "unexpected character '{ch}'"),
            LexIssue::UnterminatedString => write!(f, "unterminated string literal"),
            LexIssue::UnterminatedComment(start) => {
                write!(f, "unterminated block comment starting at offset {start}")
            }
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "number {n}"),
            TokenKind::Str(_) => write!(f, "string literal"),
            TokenKind::Identifier => write!(f, "identifier"),
            TokenKind::Operator(op) => write!(f, "'{}'", op.as_char()),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::LBracket => write!(f, "'['"),
            TokenKind::RBracket => write!(f, "']'"),
            TokenKind::LBrace => write!(f, "'{{'"),
            TokenKind::RBrace => write!(f, "'}}'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Semicolon => write!(f, "';'"),
            TokenKind::Dot => write!(f, "'.'"),
            TokenKind::Invalid(issue) => write!(f, "{issue}"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}
