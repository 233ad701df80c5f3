//! The cross-field predicate language.
//!
//! Rules combine a handful of field tests with `AND`, `OR`, `NOT`, and
//! parentheses:
//!
//! ```text
//! hidden.missing OR hidden.value == no
//! option.count >= 1 AND NOT (type.value == none)
//! ```
//!
//! Evaluation is total and three-valued: a reference to a field the block
//! does not carry degrades to `Unknown` rather than erroring, and rules only
//! fire on definite results. Connectives short-circuit.

use std::fmt;
use thiserror::Error;

/// Three-valued logic result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tri {
    True,
    False,
    Unknown,
}

impl Tri {
    /// Kleene conjunction.
    pub fn and(self, other: Tri) -> Tri {
        match (self, other) {
            (Tri::False, _) | (_, Tri::False) => Tri::False,
            (Tri::True, Tri::True) => Tri::True,
            _ => Tri::Unknown,
        }
    }

    /// Kleene disjunction.
    pub fn or(self, other: Tri) -> Tri {
        match (self, other) {
            (Tri::True, _) | (_, Tri::True) => Tri::True,
            (Tri::False, Tri::False) => Tri::False,
            _ => Tri::Unknown,
        }
    }

    /// Kleene negation.
    pub fn not(self) -> Tri {
        match self {
            Tri::True => Tri::False,
            Tri::False => Tri::True,
            Tri::Unknown => Tri::Unknown,
        }
    }

    /// From a definite boolean.
    pub fn from_bool(b: bool) -> Tri {
        if b { Tri::True } else { Tri::False }
    }
}

/// Comparison operator in a `count` test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountOp {
    Ge,
    Le,
    Gt,
    Lt,
    Eq,
}

/// Parsed predicate expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `field.exists` - at least one occurrence.
    Exists(String),
    /// `field.missing` - zero occurrences.
    Missing(String),
    /// `field.value == literal` / `field.value != literal`.
    ValueCmp { field: String, negated: bool, literal: String },
    /// `field.count >= N` and friends.
    CountCmp { field: String, op: CountOp, count: u32 },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

/// Facts an evaluator supplies about the block under test.
pub trait FieldFacts {
    /// Occurrences of `field` in the block.
    fn count(&self, field: &str) -> u32;
    /// First scalar value of `field`, if it has one.
    fn value(&self, field: &str) -> Option<String>;
}

impl Expr {
    /// Evaluate against `facts` with short-circuit, three-valued semantics.
    pub fn eval(&self, facts: &dyn FieldFacts) -> Tri {
        match self {
            Expr::Exists(field) => Tri::from_bool(facts.count(field) > 0),
            Expr::Missing(field) => Tri::from_bool(facts.count(field) == 0),
            Expr::ValueCmp { field, negated, literal } => match facts.value(field) {
                // A missing field reference degrades to Unknown.
                None => Tri::Unknown,
                Some(value) => Tri::from_bool((value == *literal) != *negated),
            },
            Expr::CountCmp { field, op, count } => {
                let actual = facts.count(field);
                let result = match op {
                    CountOp::Ge => actual >= *count,
                    CountOp::Le => actual <= *count,
                    CountOp::Gt => actual > *count,
                    CountOp::Lt => actual < *count,
                    CountOp::Eq => actual == *count,
                };
                Tri::from_bool(result)
            }
            Expr::And(a, b) => {
                let left = a.eval(facts);
                if left == Tri::False {
                    return Tri::False;
                }
                left.and(b.eval(facts))
            }
            Expr::Or(a, b) => {
                let left = a.eval(facts);
                if left == Tri::True {
                    return Tri::True;
                }
                left.or(b.eval(facts))
            }
            Expr::Not(inner) => inner.eval(facts).not(),
        }
    }
}

/// Parse failure with the offending token.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExprError {
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("unknown field test '.{0}' (expected exists, missing, value, count)")]
    UnknownTest(String),
    #[error("invalid count literal '{0}'")]
    BadCount(String),
}

/// Parse an expression string.
pub fn parse(input: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(input);
    let mut parser = ExprParser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(tok) => Err(ExprError::UnexpectedToken(tok.to_string())),
    }
}

fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in input.chars() {
        match ch {
            '(' | ')' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(ch.to_string());
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

struct ExprParser {
    tokens: Vec<String>,
    pos: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(|s| s.as_str())
    }

    fn bump(&mut self) -> Option<String> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_and()?;
        while self.peek() == Some("OR") {
            self.bump();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_unary()?;
        while self.peek() == Some("AND") {
            self.bump();
            let right = self.parse_unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        match self.peek() {
            Some("NOT") => {
                self.bump();
                Ok(Expr::Not(Box::new(self.parse_unary()?)))
            }
            Some("(") => {
                self.bump();
                let inner = self.parse_or()?;
                match self.bump().as_deref() {
                    Some(")") => Ok(inner),
                    Some(tok) => Err(ExprError::UnexpectedToken(tok.to_string())),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            Some(_) => self.parse_test(),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn parse_test(&mut self) -> Result<Expr, ExprError> {
        let token = self.bump().ok_or(ExprError::UnexpectedEnd)?;
        let (field, test) = token
            .rsplit_once('.')
            .ok_or_else(|| ExprError::UnexpectedToken(token.clone()))?;
        let field = field.to_string();
        match test {
            "exists" => Ok(Expr::Exists(field)),
            "missing" => Ok(Expr::Missing(field)),
            "value" => {
                let op = self.bump().ok_or(ExprError::UnexpectedEnd)?;
                let negated = match op.as_str() {
                    "==" => false,
                    "!=" => true,
                    other => return Err(ExprError::UnexpectedToken(other.to_string())),
                };
                let literal = self.bump().ok_or(ExprError::UnexpectedEnd)?;
                Ok(Expr::ValueCmp { field, negated, literal })
            }
            "count" => {
                let op = match self.bump().ok_or(ExprError::UnexpectedEnd)?.as_str() {
                    ">=" => CountOp::Ge,
                    "<=" => CountOp::Le,
                    ">" => CountOp::Gt,
                    "<" => CountOp::Lt,
                    "==" => CountOp::Eq,
                    other => return Err(ExprError::UnexpectedToken(other.to_string())),
                };
                let literal = self.bump().ok_or(ExprError::UnexpectedEnd)?;
                let count =
                    literal.parse::<u32>().map_err(|_| ExprError::BadCount(literal.clone()))?;
                Ok(Expr::CountCmp { field, op, count })
            }
            other => Err(ExprError::UnknownTest(other.to_string())),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Exists(field) => write!(f, "{field}.exists"),
            Expr::Missing(field) => write!(f, "{field}.missing"),
            Expr::ValueCmp { field, negated, literal } => {
                write!(f, "{field}.value {} {literal}", if *negated { "!=" } else { "==" })
            }
            Expr::CountCmp { field, op, count } => {
                let op = match op {
                    CountOp::Ge => ">=",
                    CountOp::Le => "<=",
                    CountOp::Gt => ">",
                    CountOp::Lt => "<",
                    CountOp::Eq => "==",
                };
                write!(f, "{field}.count {op} {count}")
            }
            Expr::And(a, b) => write!(f, "({a} AND {b})"),
            Expr::Or(a, b) => write!(f, "({a} OR {b})"),
            Expr::Not(inner) => write!(f, "NOT {inner}"),
        }
    }
}
