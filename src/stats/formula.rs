//! Arithmetic-only formula compiler.
//!
//! Grammar (whitespace ignored):
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := '-' unary | primary
//! primary := NUMBER | IDENT | '(' expr ')'
//! IDENT   := 'level' | name '.' ('base' | 'perLevel')
//! ```
//!
//! `level` is the only runtime variable. Dotted references read a linear rule
//! from the same species and are folded to constants at compile time, so a
//! compiled formula is a closure over `level` and nothing else.

use std::fmt;
use std::sync::Arc;

use crate::common::error::FormulaError;

/// Compiled formula: `level -> raw value`.
#[derive(Clone)]
pub struct Formula {
    source: String,
    eval: Arc<dyn Fn(f64) -> f64 + Send + Sync>,
}

impl Formula {
    /// Compile `source`, resolving dotted references through `lookup`.
    pub fn compile(
        source: &str,
        lookup: &dyn Fn(&str, &str) -> Option<f64>,
    ) -> Result<Self, FormulaError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            lookup,
        };
        let expr = parser.expr()?;
        if let Some(token) = parser.peek() {
            return Err(FormulaError::UnexpectedToken {
                found: token.to_string(),
            });
        }
        Ok(Self {
            source: source.to_string(),
            eval: Arc::from(build(expr)),
        })
    }

    pub fn eval(&self, level: f64) -> f64 {
        (self.eval)(level)
    }

}

impl fmt::Debug for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Formula").field(&self.source).finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Ident(name) => write!(f, "{}", name),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, FormulaError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' | '-' | '*' | '/' | '(' | ')' => {
                chars.next();
                tokens.push(match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '(' => Token::LParen,
                    _ => Token::RParen,
                });
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut literal = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| FormulaError::InvalidNumber { literal })?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' || d == '.' {
                        name.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(name));
            }
            other => {
                return Err(FormulaError::UnexpectedChar {
                    found: other,
                    offset,
                })
            }
        }
    }

    Ok(tokens)
}

#[derive(Debug)]
enum Expr {
    Const(f64),
    Level,
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    lookup: &'a dyn Fn(&str, &str) -> Option<f64>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Expr, FormulaError> {
        if self.peek() == Some(&Token::Minus) {
            self.pos += 1;
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, FormulaError> {
        match self.next() {
            Some(Token::Number(value)) => Ok(Expr::Const(value)),
            Some(Token::Ident(name)) => self.identifier(name),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(FormulaError::UnexpectedToken {
                        found: other.to_string(),
                    }),
                    None => Err(FormulaError::UnexpectedEnd),
                }
            }
            Some(other) => Err(FormulaError::UnexpectedToken {
                found: other.to_string(),
            }),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    fn identifier(&self, name: String) -> Result<Expr, FormulaError> {
        if name == "level" {
            return Ok(Expr::Level);
        }
        name.split_once('.')
            .and_then(|(attribute, field)| (self.lookup)(attribute, field))
            .map(Expr::Const)
            .ok_or(FormulaError::UnknownIdentifier { name })
    }
}

type Compiled = Box<dyn Fn(f64) -> f64 + Send + Sync>;

fn build(expr: Expr) -> Compiled {
    match expr {
        Expr::Const(value) => Box::new(move |_| value),
        Expr::Level => Box::new(|level| level),
        Expr::Neg(inner) => {
            let inner = build(*inner);
            Box::new(move |level| -inner(level))
        }
        Expr::Binary(op, lhs, rhs) => {
            let lhs = build(*lhs);
            let rhs = build(*rhs);
            match op {
                BinOp::Add => Box::new(move |level| lhs(level) + rhs(level)),
                BinOp::Sub => Box::new(move |level| lhs(level) - rhs(level)),
                BinOp::Mul => Box::new(move |level| lhs(level) * rhs(level)),
                BinOp::Div => Box::new(move |level| lhs(level) / rhs(level)),
            }
        }
    }
}
