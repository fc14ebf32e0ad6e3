use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::evaluator::{evaluate, Value};

/// The four arithmetic operators plus the two parentheses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "×")]
    Multiply,
    #[serde(rename = "÷")]
    Divide,
    #[serde(rename = "(")]
    OpenParen,
    #[serde(rename = ")")]
    CloseParen,
}

impl Operator {
    /// Arithmetic operators in the order the solver tries them.
    pub const ARITHMETIC: [Operator; 4] = [
        Operator::Add,
        Operator::Subtract,
        Operator::Multiply,
        Operator::Divide,
    ];

    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Subtract => '-',
            Operator::Multiply => '×',
            Operator::Divide => '÷',
            Operator::OpenParen => '(',
            Operator::CloseParen => ')',
        }
    }

    /// Parses a display symbol. `*`, `x` and `/` are accepted as keyboard aliases.
    pub fn from_symbol(symbol: char) -> Option<Operator> {
        match symbol {
            '+' => Some(Operator::Add),
            '-' => Some(Operator::Subtract),
            '×' | '*' | 'x' => Some(Operator::Multiply),
            '÷' | '/' => Some(Operator::Divide),
            '(' => Some(Operator::OpenParen),
            ')' => Some(Operator::CloseParen),
            _ => None,
        }
    }

    pub fn is_arithmetic(self) -> bool {
        !matches!(self, Operator::OpenParen | Operator::CloseParen)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A single element of an expression: a number or an operator symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Token {
    Number(i64),
    Operator(Operator),
}

impl Token {
    pub fn is_number(&self) -> bool {
        matches!(self, Token::Number(_))
    }
}

impl From<i64> for Token {
    fn from(value: i64) -> Self {
        Token::Number(value)
    }
}

impl From<Operator> for Token {
    fn from(operator: Operator) -> Self {
        Token::Operator(operator)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Operator(op) => write!(f, "{}", op),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Unknown symbol '{symbol}' at position {position}")]
    UnknownSymbol { position: usize, symbol: char },
    #[error("Number '{text}' at position {position} is out of range")]
    NumberOutOfRange { position: usize, text: String },
    #[error("Token '{token}' is not allowed at position {position}")]
    UnexpectedToken { position: usize, token: Token },
    #[error("Expression is incomplete")]
    Incomplete,
}

/// Renders tokens separated by single spaces, e.g. `( 2 + 3 ) × 4`.
pub fn format_expression(tokens: &[Token]) -> String {
    tokens.iter().join(" ")
}

/// Splits display text such as `(25 + 50) × 3` into tokens.
///
/// Only lexical problems are reported; a grammatically broken sequence
/// like `3 + + 4` tokenizes fine.
pub fn tokenize(text: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        if c.is_whitespace() {
            continue;
        }

        if c.is_ascii_digit() {
            let mut digits = String::from(c);
            while let Some(&(_, next)) = chars.peek() {
                if !next.is_ascii_digit() {
                    break;
                }
                digits.push(next);
                chars.next();
            }
            let value = digits
                .parse::<i64>()
                .map_err(|_| ExpressionError::NumberOutOfRange {
                    position,
                    text: digits.clone(),
                })?;
            tokens.push(Token::Number(value));
            continue;
        }

        match Operator::from_symbol(c) {
            Some(op) => tokens.push(Token::Operator(op)),
            None => return Err(ExpressionError::UnknownSymbol { position, symbol: c }),
        }
    }

    Ok(tokens)
}

/// A token sequence that only ever grows by grammatically legal steps.
///
/// Every prefix of an `Expression` satisfies the construction rules: it starts
/// with a number or `(`, numbers and `(` only appear where a number is
/// expected, arithmetic operators only follow a number or `)`, and `)` only
/// closes an open `(`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Token>", into = "Vec<Token>")]
pub struct Expression(Vec<Token>);

impl Expression {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn tokens(&self) -> &[Token] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True at the start, after an arithmetic operator, and after `(`.
    pub fn expects_number(&self) -> bool {
        match self.0.last() {
            None => true,
            Some(Token::Number(_)) | Some(Token::Operator(Operator::CloseParen)) => false,
            Some(Token::Operator(_)) => true,
        }
    }

    /// Number of `(` not yet matched by a `)`.
    pub fn open_paren_count(&self) -> usize {
        self.0.iter().fold(0usize, |open, token| match token {
            Token::Operator(Operator::OpenParen) => open + 1,
            Token::Operator(Operator::CloseParen) => open.saturating_sub(1),
            Token::Number(_) | Token::Operator(_) => open,
        })
    }

    pub fn can_push(&self, token: &Token) -> bool {
        match token {
            Token::Number(_) | Token::Operator(Operator::OpenParen) => self.expects_number(),
            Token::Operator(Operator::CloseParen) => {
                !self.expects_number() && self.open_paren_count() > 0
            }
            Token::Operator(_) => !self.expects_number(),
        }
    }

    /// Appends `token`, rejecting it if it would break the construction rules.
    pub fn push(&mut self, token: Token) -> Result<(), ExpressionError> {
        if !self.can_push(&token) {
            return Err(ExpressionError::UnexpectedToken {
                position: self.0.len(),
                token,
            });
        }
        self.0.push(token);
        Ok(())
    }

    /// Returns a copy extended by `token`, or `None` if the token is not legal here.
    pub fn with_token(&self, token: Token) -> Option<Expression> {
        if !self.can_push(&token) {
            return None;
        }
        let mut tokens = Vec::with_capacity(self.0.len() + 1);
        tokens.extend_from_slice(&self.0);
        tokens.push(token);
        Some(Self(tokens))
    }

    /// Non-empty, ends in a number and has no unmatched `(`.
    pub fn is_complete(&self) -> bool {
        matches!(self.0.last(), Some(Token::Number(_))) && self.open_paren_count() == 0
    }

    /// The numbers used by this expression, in order of appearance.
    pub fn numbers(&self) -> impl Iterator<Item = i64> + '_ {
        self.0.iter().filter_map(|token| match token {
            Token::Number(n) => Some(*n),
            Token::Operator(_) => None,
        })
    }

    pub fn evaluate(&self) -> Value {
        evaluate(&self.0)
    }
}

impl TryFrom<Vec<Token>> for Expression {
    type Error = ExpressionError;

    fn try_from(tokens: Vec<Token>) -> Result<Self, Self::Error> {
        let mut expression = Expression::new();
        for token in tokens {
            expression.push(token)?;
        }
        if !expression.is_complete() {
            return Err(ExpressionError::Incomplete);
        }
        Ok(expression)
    }
}

impl From<Expression> for Vec<Token> {
    fn from(expression: Expression) -> Self {
        expression.0
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", format_expression(&self.0))
    }
}
