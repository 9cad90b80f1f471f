//! Arithmetic over viewport variables.
//!
//! Positional attributes may contain small expressions such as
//! `appWidth/2` or `appHeight-(64*2)`. This module evaluates exactly that:
//! numbers, `+ - * / %`, unary sign, parentheses, and the two names
//! `appWidth` / `appHeight`. Nothing else is accepted.
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/' | '%') unary)*
//! unary  := ('+' | '-') unary | atom
//! atom   := number | ident | '(' expr ')'
//! ```

use std::fmt;

use crate::error::SceneError;

/// Values available to expressions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    fn lookup(&self, name: &str) -> Option<f32> {
        match name {
            "appWidth" => Some(self.width),
            "appHeight" => Some(self.height),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f32),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{n}"),
            Token::Ident(s) => write!(f, "{s}"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let b = bytes[pos];
        match b {
            b' ' | b'\t' | b'\n' | b'\r' => pos += 1,
            b'+' => {
                tokens.push(Token::Plus);
                pos += 1;
            }
            b'-' => {
                tokens.push(Token::Minus);
                pos += 1;
            }
            b'*' => {
                tokens.push(Token::Star);
                pos += 1;
            }
            b'/' => {
                tokens.push(Token::Slash);
                pos += 1;
            }
            b'%' => {
                tokens.push(Token::Percent);
                pos += 1;
            }
            b'(' => {
                tokens.push(Token::LParen);
                pos += 1;
            }
            b')' => {
                tokens.push(Token::RParen);
                pos += 1;
            }
            b'0'..=b'9' | b'.' => {
                let start = pos;
                while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
                    pos += 1;
                }
                let text = &input[start..pos];
                let value = text
                    .parse::<f32>()
                    .map_err(|_| format!("invalid number '{text}'"))?;
                tokens.push(Token::Number(value));
            }
            b if b.is_ascii_alphabetic() || b == b'_' => {
                let start = pos;
                while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
                {
                    pos += 1;
                }
                tokens.push(Token::Ident(input[start..pos].to_string()));
            }
            other => {
                return Err(format!("unexpected character '{}' at {pos}", other as char));
            }
        }
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}

struct Parser<'v> {
    tokens: Vec<Token>,
    pos: usize,
    viewport: &'v Viewport,
}

impl Parser<'_> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expr(&mut self) -> Result<f32, String> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Token::Plus => {
                    self.advance();
                    value += self.term()?;
                }
                Token::Minus => {
                    self.advance();
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<f32, String> {
        let mut value = self.unary()?;
        loop {
            match self.peek() {
                Token::Star => {
                    self.advance();
                    value *= self.unary()?;
                }
                Token::Slash => {
                    self.advance();
                    value /= self.unary()?;
                }
                Token::Percent => {
                    self.advance();
                    value %= self.unary()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn unary(&mut self) -> Result<f32, String> {
        match self.peek() {
            Token::Minus => {
                self.advance();
                Ok(-self.unary()?)
            }
            Token::Plus => {
                self.advance();
                self.unary()
            }
            _ => self.atom(),
        }
    }

    fn atom(&mut self) -> Result<f32, String> {
        match self.advance() {
            Token::Number(n) => Ok(n),
            Token::Ident(name) => self
                .viewport
                .lookup(&name)
                .ok_or_else(|| format!("unknown name '{name}'")),
            Token::LParen => {
                let value = self.expr()?;
                match self.advance() {
                    Token::RParen => Ok(value),
                    other => Err(format!("expected ), got {other}")),
                }
            }
            other => Err(format!("unexpected {other}")),
        }
    }
}

/// Evaluate an expression against the given viewport.
pub fn eval(input: &str, viewport: &Viewport) -> Result<f32, SceneError> {
    let to_error = |message: String| SceneError::Expression {
        expr: input.to_string(),
        message,
    };

    let tokens = tokenize(input).map_err(to_error)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        viewport,
    };
    let value = parser.expr().map_err(to_error)?;
    match parser.peek() {
        Token::Eof => Ok(value),
        other => Err(to_error(format!("unexpected trailing {other}"))),
    }
}
