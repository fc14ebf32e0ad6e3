use serde::Serialize;
use std::fmt;

use crate::token::{Operator, Token};

/// The result of evaluating an expression.
///
/// Division by zero produces `Infinity`, which then absorbs every further
/// operation. Integer overflow is folded into the same sentinel. Neither can
/// ever compare equal to an integer target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Value {
    Integer(i64),
    Infinity,
}

impl Value {
    pub const ZERO: Value = Value::Integer(0);

    pub fn as_integer(self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(n),
            Value::Infinity => None,
        }
    }

    fn apply(self, op: Operator, rhs: Value) -> Value {
        let (Value::Integer(a), Value::Integer(b)) = (self, rhs) else {
            return Value::Infinity;
        };
        let result = match op {
            Operator::Add => a.checked_add(b),
            Operator::Subtract => a.checked_sub(b),
            Operator::Multiply => a.checked_mul(b),
            Operator::Divide => floor_div(a, b),
            Operator::OpenParen | Operator::CloseParen => return self,
        };
        result.map_or(Value::Infinity, Value::Integer)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl PartialEq<i64> for Value {
    fn eq(&self, other: &i64) -> bool {
        *self == Value::Integer(*other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Infinity => write!(f, "∞"),
        }
    }
}

/// Integer division rounding toward negative infinity; `None` on a zero
/// divisor or overflow.
fn floor_div(a: i64, b: i64) -> Option<i64> {
    let quotient = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Some(quotient - 1)
    } else {
        Some(quotient)
    }
}

/// Working representation: parenthesized groups collapse into values.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Term {
    Value(Value),
    Op(Operator),
}

/// Evaluates a token sequence with the usual precedence rules.
///
/// `×` and `÷` bind tighter than `+` and `-`, operators of equal precedence
/// associate left to right, and division floors. The function is total:
/// malformed input yields a best-effort value instead of an error. An
/// unmatched `(` or `)` is ignored.
pub fn evaluate(tokens: &[Token]) -> Value {
    let Some(first) = tokens.first() else {
        return Value::ZERO;
    };

    if tokens.iter().all(Token::is_number) {
        return match first {
            Token::Number(n) => Value::Integer(*n),
            Token::Operator(_) => Value::ZERO,
        };
    }

    let mut terms: Vec<Term> = tokens
        .iter()
        .map(|token| match token {
            Token::Number(n) => Term::Value(Value::Integer(*n)),
            Token::Operator(op) => Term::Op(*op),
        })
        .collect();

    // Collapse the innermost group first: the last `(` and the first `)` after it.
    while let Some(open) = terms
        .iter()
        .rposition(|term| *term == Term::Op(Operator::OpenParen))
    {
        let Some(close) = terms[open..]
            .iter()
            .position(|term| *term == Term::Op(Operator::CloseParen))
            .map(|offset| open + offset)
        else {
            terms.retain(|term| *term != Term::Op(Operator::OpenParen));
            break;
        };

        let inner = evaluate_flat(&terms[open + 1..close]);
        terms.splice(open..=close, [Term::Value(inner)]);
    }

    terms.retain(|term| *term != Term::Op(Operator::CloseParen));
    evaluate_flat(&terms)
}

/// Evaluates a parenthesis-free run of terms in two left-to-right passes.
fn evaluate_flat(terms: &[Term]) -> Value {
    let mut terms = terms.to_vec();

    for pass in [
        [Operator::Multiply, Operator::Divide],
        [Operator::Add, Operator::Subtract],
    ] {
        let mut i = 1;
        while i + 1 < terms.len() {
            match (terms[i - 1], terms[i], terms[i + 1]) {
                (Term::Value(left), Term::Op(op), Term::Value(right)) if pass.contains(&op) => {
                    terms.splice(i - 1..=i + 1, [Term::Value(left.apply(op, right))]);
                }
                _ => i += 2,
            }
        }
    }

    match terms.first() {
        Some(Term::Value(value)) => *value,
        _ => Value::ZERO,
    }
}
