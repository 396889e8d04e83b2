// Copyright (c) The Diem Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! CFGQL tokenizer.
//!
//! Splits a single statement into tokens, each carrying the byte offset
//! it started at so parse errors can point into the source. The token set
//! is deliberately small: identifiers, the path/operator punctuation, and
//! typed literals. `true`, `false` and `null` are lexed as identifiers;
//! the parser decides whether an identifier is a keyword from context.
//!
//! Two lexical rules are strict by design:
//!
//! * single-quoted strings are rejected outright, and
//! * `-` starts a numeric literal only when a digit follows, otherwise it
//!   is the trailing delete marker.

use crate::error::{ConfigError, Result};

/// One lexical token.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Dot,
    Equals,
    Minus,
    Bang,
    LBracket,
    RBracket,
    Comma,
    Eof,
}

impl Token {
    /// Human-readable rendering used in parse error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier '{name}'"),
            Token::Str(_) => "string literal".to_string(),
            Token::Int(i) => format!("integer literal {i}"),
            Token::Float(f) => format!("float literal {f}"),
            Token::Dot => "'.'".to_string(),
            Token::Equals => "'='".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Bang => "'!'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Eof => "end of statement".to_string(),
        }
    }
}

/// A token plus the byte offset it started at.
#[derive(Clone, Debug, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub offset: usize,
}

/// Tokenizes one CFGQL statement. The returned sequence always ends with
/// a single [`Token::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>> {
    let mut lexer = Lexer {
        bytes: source.as_bytes(),
        pos: 0,
    };
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.token == Token::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

struct Lexer<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn next_token(&mut self) -> Result<SpannedToken> {
        self.skip_whitespace();
        let offset = self.pos;
        let byte = match self.peek() {
            Some(b) => b,
            None => {
                return Ok(SpannedToken {
                    token: Token::Eof,
                    offset,
                })
            }
        };

        let token = match byte {
            b'.' => self.punct(Token::Dot),
            b'=' => self.punct(Token::Equals),
            b'!' => self.punct(Token::Bang),
            b'[' => self.punct(Token::LBracket),
            b']' => self.punct(Token::RBracket),
            b',' => self.punct(Token::Comma),
            b'-' => {
                // A minus only opens a literal when a digit follows;
                // a bare minus is the delete marker.
                if self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) {
                    self.lex_number(offset)?
                } else {
                    self.punct(Token::Minus)
                }
            }
            b'"' => self.lex_string(offset)?,
            b'\'' => {
                return Err(parse_error(
                    offset,
                    "single-quoted strings are not allowed; use double quotes",
                ))
            }
            b if b.is_ascii_digit() => self.lex_number(offset)?,
            b if b == b'_' || b.is_ascii_alphabetic() => self.lex_ident(),
            b => {
                return Err(parse_error(
                    offset,
                    format!("unexpected character '{}'", char::from(b)),
                ))
            }
        };
        Ok(SpannedToken { token, offset })
    }

    fn punct(&mut self, token: Token) -> Token {
        self.pos += 1;
        token
    }

    fn lex_ident(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b == b'_' || b.is_ascii_alphanumeric())
        {
            self.pos += 1;
        }
        // Identifier bytes are a strict ASCII subset, so the slice is
        // valid UTF-8.
        let name = std::str::from_utf8(&self.bytes[start..self.pos])
            .expect("identifier bytes are ASCII")
            .to_string();
        Token::Ident(name)
    }

    fn lex_number(&mut self, offset: usize) -> Result<Token> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        self.consume_digits();

        let mut is_float = false;
        // A fractional part needs a digit after the dot; a bare trailing
        // dot belongs to path syntax and stays untouched.
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) {
            is_float = true;
            self.pos += 1;
            self.consume_digits();
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            let mut lookahead = 1;
            if matches!(self.peek_at(1), Some(b'+') | Some(b'-')) {
                lookahead = 2;
            }
            if self.peek_at(lookahead).is_some_and(|b| b.is_ascii_digit()) {
                is_float = true;
                self.pos += lookahead;
                self.consume_digits();
            }
        }

        let text = std::str::from_utf8(&self.bytes[start..self.pos])
            .expect("numeric literal bytes are ASCII");
        if is_float {
            let f = text
                .parse::<f64>()
                .map_err(|_| parse_error(offset, format!("malformed float literal '{text}'")))?;
            Ok(Token::Float(f))
        } else {
            let i = text.parse::<i64>().map_err(|_| {
                parse_error(offset, format!("integer literal '{text}' out of range"))
            })?;
            Ok(Token::Int(i))
        }
    }

    fn lex_string(&mut self, offset: usize) -> Result<Token> {
        debug_assert_eq!(self.peek(), Some(b'"'));
        self.pos += 1;
        let mut out = Vec::new();
        loop {
            match self.peek() {
                None => return Err(parse_error(offset, "unterminated string literal")),
                Some(b'"') => {
                    self.pos += 1;
                    let s = String::from_utf8(out).map_err(|_| {
                        parse_error(offset, "string literal is not valid UTF-8")
                    })?;
                    return Ok(Token::Str(s));
                }
                Some(b'\\') => {
                    let escape_at = self.pos;
                    self.pos += 1;
                    let escaped = match self.peek() {
                        Some(b'\\') => b'\\',
                        Some(b'"') => b'"',
                        Some(b'n') => b'\n',
                        Some(b'r') => b'\r',
                        Some(b't') => b'\t',
                        Some(other) => {
                            return Err(parse_error(
                                escape_at,
                                format!("unknown escape sequence '\\{}'", char::from(other)),
                            ))
                        }
                        None => {
                            return Err(parse_error(offset, "unterminated string literal"))
                        }
                    };
                    out.push(escaped);
                    self.pos += 1;
                }
                Some(b) => {
                    out.push(b);
                    self.pos += 1;
                }
            }
        }
    }

    fn consume_digits(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }
}

fn parse_error(offset: usize, message: impl Into<String>) -> ConfigError {
    ConfigError::Parse {
        offset,
        message: message.into(),
    }
}
