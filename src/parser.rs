// Copyright (c) The Diem Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! CFGQL parser.
//!
//! Single-pass recursive descent over the token stream with one token of
//! lookahead. The grammar:
//!
//! ```text
//! statement := path_expr ( op )?
//! path_expr := IDENT ( "." IDENT )*
//! op        := "=" value        (SET)
//!            | "-"              (DELETE)
//!            | "!"              (SAFE GET)
//!            | (empty)          (GET)
//! value     := scalar | list
//! scalar    := STRING | INTEGER | FLOAT | "true" | "false" | "null"
//! list      := "[" ( value ( "," value )* )? "]"
//! ```
//!
//! Values in the produced [`Statement`] are already typed. Barewords in
//! value position are rejected: `a.b=dark` is a parse error, `a.b="dark"`
//! is not.

use crate::{
    error::{ConfigError, Result},
    lexer::{tokenize, SpannedToken, Token},
    value::Value,
};

/// One parsed CFGQL statement.
#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    /// `path = value`
    Set { path: Vec<String>, value: Value },
    /// `path`
    Get { path: Vec<String> },
    /// `path!`
    SafeGet { path: Vec<String> },
    /// `path-`
    Delete { path: Vec<String> },
}

impl Statement {
    /// Whether executing this statement changes the tree. Mutating
    /// statements are the ones the store records in its write-ahead log.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Statement::Set { .. } | Statement::Delete { .. })
    }

    /// The dotted path this statement addresses.
    pub fn path(&self) -> &[String] {
        match self {
            Statement::Set { path, .. }
            | Statement::Get { path }
            | Statement::SafeGet { path }
            | Statement::Delete { path } => path,
        }
    }
}

/// Parses a single CFGQL statement.
pub fn parse(source: &str) -> Result<Statement> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let statement = parser.statement()?;
    parser.expect_eof()?;
    Ok(statement)
}

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    fn statement(&mut self) -> Result<Statement> {
        let path = self.path_expr()?;
        match &self.peek().token {
            Token::Equals => {
                self.advance();
                let value = self.value()?;
                Ok(Statement::Set { path, value })
            }
            Token::Minus => {
                self.advance();
                Ok(Statement::Delete { path })
            }
            Token::Bang => {
                self.advance();
                Ok(Statement::SafeGet { path })
            }
            Token::Eof => Ok(Statement::Get { path }),
            _ => Err(self.unexpected("'=', '-', '!' or end of statement")),
        }
    }

    fn path_expr(&mut self) -> Result<Vec<String>> {
        let mut segments = vec![self.ident()?];
        while self.peek().token == Token::Dot {
            self.advance();
            segments.push(self.ident()?);
        }
        Ok(segments)
    }

    fn ident(&mut self) -> Result<String> {
        match &self.peek().token {
            Token::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn value(&mut self) -> Result<Value> {
        let spanned = self.peek().clone();
        match spanned.token {
            Token::Str(s) => {
                self.advance();
                Ok(Value::Str(s))
            }
            Token::Int(i) => {
                self.advance();
                Ok(Value::Int(i))
            }
            Token::Float(f) => {
                self.advance();
                Ok(Value::Float(f))
            }
            Token::Ident(name) => match name.as_str() {
                "true" => {
                    self.advance();
                    Ok(Value::Bool(true))
                }
                "false" => {
                    self.advance();
                    Ok(Value::Bool(false))
                }
                "null" => {
                    self.advance();
                    Ok(Value::Null)
                }
                other => Err(ConfigError::Parse {
                    offset: spanned.offset,
                    message: format!(
                        "bareword '{other}' is not a value; string values must be double-quoted"
                    ),
                }),
            },
            Token::LBracket => self.list(),
            _ => Err(self.unexpected("value")),
        }
    }

    fn list(&mut self) -> Result<Value> {
        debug_assert_eq!(self.peek().token, Token::LBracket);
        self.advance();

        let mut items = Vec::new();
        if self.peek().token == Token::RBracket {
            self.advance();
            return Ok(Value::List(items));
        }
        loop {
            items.push(self.value()?);
            match &self.peek().token {
                Token::Comma => {
                    self.advance();
                }
                Token::RBracket => {
                    self.advance();
                    return Ok(Value::List(items));
                }
                _ => return Err(self.unexpected("',' or ']'")),
            }
        }
    }

    fn expect_eof(&mut self) -> Result<()> {
        if self.peek().token == Token::Eof {
            Ok(())
        } else {
            Err(self.unexpected("end of statement"))
        }
    }

    fn peek(&self) -> &SpannedToken {
        // `tokenize` guarantees a trailing Eof, so the cursor never runs
        // off the end.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn unexpected(&self, expected: &str) -> ConfigError {
        let spanned = self.peek();
        ConfigError::Parse {
            offset: spanned.offset,
            message: format!("expected {expected}, found {}", spanned.token.describe()),
        }
    }
}
