//! Criteria expression evaluator.
//!
//! Evaluation is pure and infallible: the parser proved every attribute
//! reference well-typed, and a value missing from the participant's record
//! simply makes the enclosing comparison false.

use super::ast::{CompareOp, Expr, Scalar};
use super::{AttributeMap, AttributeValue};

pub fn evaluate(expr: &Expr, attributes: &AttributeMap) -> bool {
    match expr {
        Expr::And(left, right) => evaluate(left, attributes) && evaluate(right, attributes),
        Expr::Or(left, right) => evaluate(left, attributes) || evaluate(right, attributes),
        Expr::Not(inner) => !evaluate(inner, attributes),
        Expr::Literal(value) => *value,
        Expr::Compare { attr, op, value } => match attributes.get(attr) {
            Some(actual) => compare(actual, *op, value),
            None => false,
        },
        Expr::Contains { attr, value } => match attributes.get(attr) {
            Some(AttributeValue::List(items)) => items.iter().any(|item| item == value),
            _ => false,
        },
        Expr::OneOf { attr, values } => match attributes.get(attr) {
            Some(actual) => values.iter().any(|v| scalar_eq(actual, v)),
            None => false,
        },
    }
}

fn compare(actual: &AttributeValue, op: CompareOp, expected: &Scalar) -> bool {
    match op {
        CompareOp::Eq => scalar_eq(actual, expected),
        CompareOp::Ne => !scalar_eq(actual, expected),
        // Ordering is only well-typed for integers; anything else means the
        // stored value disagrees with the vocabulary, which reads as false.
        CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => {
            match (actual, expected) {
                (AttributeValue::Int(a), Scalar::Int(b)) => match op {
                    CompareOp::Lt => a < b,
                    CompareOp::Le => a <= b,
                    CompareOp::Gt => a > b,
                    CompareOp::Ge => a >= b,
                    _ => unreachable!(),
                },
                _ => false,
            }
        }
    }
}

fn scalar_eq(actual: &AttributeValue, expected: &Scalar) -> bool {
    match (actual, expected) {
        (AttributeValue::Bool(a), Scalar::Bool(b)) => a == b,
        (AttributeValue::Int(a), Scalar::Int(b)) => a == b,
        (AttributeValue::Text(a), Scalar::Text(b)) => a == b,
        _ => false,
    }
}
