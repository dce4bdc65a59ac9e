//! Type-aware arithmetic, comparison and logical operations
//!
//! Operands reaching these functions are ordinary data; specials and demands
//! have already been propagated by the caller. Failures are returned as
//! special values, never as errors.

use crate::value::{Special, Value};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    And,
    Or,
}

impl BinaryOp {
    /// Returns the operator as written in source
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Power => "^",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessOrEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterOrEqual => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// Whether the right operand is skipped once the left decides the result
    pub fn is_short_circuit(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Negate,
    Not,
}

pub fn binary_operation(left: &Value, op: BinaryOp, right: &Value) -> Value {
    match op {
        BinaryOp::Add
        | BinaryOp::Subtract
        | BinaryOp::Multiply
        | BinaryOp::Divide
        | BinaryOp::Modulo
        | BinaryOp::Power => arithmetic_operation(left, op, right),
        BinaryOp::Equal | BinaryOp::NotEqual => equality_operation(left, op, right),
        BinaryOp::Less | BinaryOp::LessOrEqual | BinaryOp::Greater | BinaryOp::GreaterOrEqual => {
            ordering_operation(left, op, right)
        }
        BinaryOp::And | BinaryOp::Or => match (left, right) {
            (Value::Boolean(l), Value::Boolean(r)) => Value::Boolean(if op == BinaryOp::And {
                *l && *r
            } else {
                *l || *r
            }),
            _ => Value::Special(Special::TypeError),
        },
    }
}

pub fn unary_operation(op: UnaryOp, operand: &Value) -> Value {
    match (op, operand) {
        (UnaryOp::Negate, Value::Number(n)) => Value::Number(-*n),
        (UnaryOp::Not, Value::Boolean(b)) => Value::Boolean(!*b),
        _ => Value::Special(Special::TypeError),
    }
}

/// Arithmetic on numbers; `+` also concatenates text.
///
/// # Examples
/// ```text
/// 7 + 5 = 12
/// 7 % 5 = 2
/// 7 / 0 = special<arithmetic-error>
/// "a" + "b" = "ab"
/// ```
fn arithmetic_operation(left: &Value, op: BinaryOp, right: &Value) -> Value {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => number_arithmetic(*l, op, *r)
            .map(Value::Number)
            .unwrap_or(Value::Special(Special::ArithmeticError)),
        (Value::Text(l), Value::Text(r)) if op == BinaryOp::Add => Value::Text(format!("{}{}", l, r)),
        _ => Value::Special(Special::TypeError),
    }
}

fn number_arithmetic(left: Decimal, op: BinaryOp, right: Decimal) -> Option<Decimal> {
    match op {
        BinaryOp::Add => left.checked_add(right),
        BinaryOp::Subtract => left.checked_sub(right),
        BinaryOp::Multiply => left.checked_mul(right),
        BinaryOp::Divide => left.checked_div(right),
        BinaryOp::Modulo => left.checked_rem(right),
        BinaryOp::Power => {
            let base = left.to_f64()?;
            let exp = right.to_f64()?;
            let result = base.powf(exp);
            if result.is_finite() {
                Decimal::from_f64_retain(result)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn equality_operation(left: &Value, op: BinaryOp, right: &Value) -> Value {
    if left.kind() != right.kind() {
        return Value::Special(Special::TypeError);
    }
    let equal = left == right;
    Value::Boolean(if op == BinaryOp::Equal { equal } else { !equal })
}

fn ordering_operation(left: &Value, op: BinaryOp, right: &Value) -> Value {
    let Some(ordering) = left.compare(right) else {
        return Value::Special(Special::TypeError);
    };
    let result = match op {
        BinaryOp::Less => ordering == Ordering::Less,
        BinaryOp::LessOrEqual => ordering != Ordering::Greater,
        BinaryOp::Greater => ordering == Ordering::Greater,
        BinaryOp::GreaterOrEqual => ordering != Ordering::Less,
        _ => return Value::Special(Special::TypeError),
    };
    Value::Boolean(result)
}
