//! Lexer for SAPF source text.
//!
//! Converts source text into a flat sequence of [`Token`]s. Lexing never
//! fails: anything the lexer cannot make sense of becomes an
//! [`TokenKind::Invalid`] token, and the parser reports it with its offset.

use super::token::{LexIssue, Operator, Token, TokenKind};

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    /// Byte offset of `chars[pos]` in the original source.
    offset: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            offset: 0,
        }
    }

    /// Tokenize the whole input. The result always ends with an `Eof` token.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            if let Some(invalid) = self.skip_trivia() {
                // An unterminated block comment swallows the rest of the input.
                tokens.push(invalid);
                tokens.push(self.token_here(TokenKind::Eof, String::new()));
                break;
            }

            if self.is_at_end() {
                tokens.push(self.token_here(TokenKind::Eof, String::new()));
                break;
            }

            let ch = self.peek();
            let token = match ch {
                '(' => self.single_char(TokenKind::LParen),
                ')' => self.single_char(TokenKind::RParen),
                '[' => self.single_char(TokenKind::LBracket),
                ']' => self.single_char(TokenKind::RBracket),
                '{' => self.single_char(TokenKind::LBrace),
                '}' => self.single_char(TokenKind::RBrace),
                ',' => self.single_char(TokenKind::Comma),
                ';' => self.single_char(TokenKind::Semicolon),
                '.' if self.peek_next().is_some_and(|c| c.is_ascii_digit()) => self.lex_number(),
                '.' => self.single_char(TokenKind::Dot),
                '"' | '\'' => self.lex_string(ch),
                '0'..='9' => self.lex_number(),
                'a'..='z' | 'A'..='Z' | '_' => self.lex_identifier(),
                _ => match Operator::from_char(ch) {
                    Some(op) => self.single_char(TokenKind::Operator(op)),
                    None => self.single_char(TokenKind::Invalid(LexIssue::UnexpectedChar(ch))),
                },
            };

            tokens.push(token);
        }

        tokens
    }

    fn peek(&self) -> char {
        self.chars[self.pos]
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    fn advance(&mut self) -> char {
        let ch = self.chars[self.pos];
        self.pos += 1;
        self.offset += ch.len_utf8();
        ch
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn token_here(&self, kind: TokenKind, text: String) -> Token {
        Token {
            kind,
            text,
            offset: self.offset,
        }
    }

    /// Skip whitespace and comments. Returns an `Invalid` token positioned at
    /// end of input if a block comment is never closed.
    fn skip_trivia(&mut self) -> Option<Token> {
        loop {
            while !self.is_at_end() && self.peek().is_whitespace() {
                self.advance();
            }

            if self.is_at_end() || self.peek() != '/' {
                return None;
            }

            match self.peek_next() {
                Some('/') => {
                    while !self.is_at_end() && self.peek() != '\n' {
                        self.advance();
                    }
                }
                Some('*') => {
                    let start = self.offset;
                    self.advance();
                    self.advance();
                    loop {
                        if self.is_at_end() {
                            return Some(self.token_here(
                                TokenKind::Invalid(LexIssue::UnterminatedComment(start)),
                                String::new(),
                            ));
                        }
                        if self.peek() == '*' && self.peek_next() == Some('/') {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                }
                _ => return None,
            }
        }
    }

    fn single_char(&mut self, kind: TokenKind) -> Token {
        let offset = self.offset;
        let ch = self.advance();
        Token {
            kind,
            text: ch.to_string(),
            offset,
        }
    }

    fn lex_string(&mut self, quote: char) -> Token {
        let offset = self.offset;
        self.advance(); // consume opening quote
        let mut value = String::new();

        while !self.is_at_end() && self.peek() != quote {
            let ch = self.advance();
            if ch == '\\' {
                if self.is_at_end() {
                    break;
                }
                let escaped = self.advance();
                value.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    other => other,
                });
            } else {
                value.push(ch);
            }
        }

        if self.is_at_end() {
            return Token {
                kind: TokenKind::Invalid(LexIssue::UnterminatedString),
                text: value,
                offset,
            };
        }
        self.advance(); // consume closing quote

        Token {
            kind: TokenKind::Str(value.clone()),
            text: value,
            offset,
        }
    }

    fn lex_number(&mut self) -> Token {
        let offset = self.offset;
        let mut s = String::new();

        while !self.is_at_end() && self.peek().is_ascii_digit() {
            s.push(self.advance());
        }

        // Fractional part only when a digit follows the dot, so `1.` lexes as `1` `.`.
        if !self.is_at_end()
            && self.peek() == '.'
            && self.peek_next().is_some_and(|c| c.is_ascii_digit())
        {
            s.push(self.advance());
            while !self.is_at_end() && self.peek().is_ascii_digit() {
                s.push(self.advance());
            }
        }

        if !self.is_at_end() && matches!(self.peek(), 'e' | 'E') {
            let digits_at = match self.peek_next() {
                Some('+') | Some('-') => 2,
                _ => 1,
            };
            if self.peek_at(digits_at).is_some_and(|c| c.is_ascii_digit()) {
                for _ in 0..digits_at {
                    s.push(self.advance());
                }
                while !self.is_at_end() && self.peek().is_ascii_digit() {
                    s.push(self.advance());
                }
            }
        }

        // The accepted shapes are all valid `f64` syntax.
        let value = s.parse::<f64>().unwrap_or(f64::NAN);
        Token {
            kind: TokenKind::Number(value),
            text: s,
            offset,
        }
    }

    fn lex_identifier(&mut self) -> Token {
        let offset = self.offset;
        let mut s = String::new();

        while !self.is_at_end() && (self.peek().is_ascii_alphanumeric() || self.peek() == '_') {
            s.push(self.advance());
        }

        Token {
            kind: TokenKind::Identifier,
            text: s,
            offset,
        }
    }
}

/// Tokenize `source` in one call.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}
