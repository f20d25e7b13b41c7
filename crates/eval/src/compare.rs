//! Field comparison semantics.
//!
//! Each runtime type defines which of the eight operators apply and how:
//! amounts compare numerically, times chronologically, text
//! lexicographically (with `contains` as substring match). The operand
//! literal is interpreted under the field's type, so `amount is 42` and
//! `desc is 42` mean different comparisons of different values.

use rust_decimal::Decimal;
use tally_core::CompareOp;
use time::OffsetDateTime;

use crate::record::{
    parse_amount_literal, parse_time_literal, EvalError, FieldValue, TimeLiteral,
};

/// Compare a field value against an operand literal.
///
/// A field with no value fails every positive comparison and passes
/// every negated one.
pub fn compare(value: &FieldValue, op: CompareOp, operand: &str) -> Result<bool, EvalError> {
    match value {
        FieldValue::Absent => Ok(op.is_negated()),
        FieldValue::Text(text) => Ok(compare_text(text, op, operand)),
        FieldValue::Amount(amount) => compare_amount(*amount, op, operand),
        FieldValue::Time(time) => compare_time(*time, op, operand),
    }
}

fn compare_text(text: &str, op: CompareOp, operand: &str) -> bool {
    match op {
        CompareOp::Equals => text == operand,
        CompareOp::NotEquals => text != operand,
        CompareOp::Contains => text.contains(operand),
        CompareOp::NotContains => !text.contains(operand),
        CompareOp::GreaterThan => text > operand,
        CompareOp::LessThan => text < operand,
        CompareOp::GreaterOrEqual => text >= operand,
        CompareOp::LessOrEqual => text <= operand,
    }
}

fn compare_amount(amount: Decimal, op: CompareOp, operand: &str) -> Result<bool, EvalError> {
    let rhs = parse_amount_literal(operand)?;
    compare_ordered(&amount, &rhs, op, "amount")
}

fn compare_time(time: OffsetDateTime, op: CompareOp, operand: &str) -> Result<bool, EvalError> {
    match parse_time_literal(operand)? {
        TimeLiteral::Day(day) => compare_ordered(&time.date(), &day, op, "time"),
        TimeLiteral::Instant(instant) => compare_ordered(&time, &instant, op, "time"),
    }
}

/// Ordering comparison for types where `contains` has no meaning.
fn compare_ordered<T: PartialOrd>(
    lhs: &T,
    rhs: &T,
    op: CompareOp,
    type_name: &'static str,
) -> Result<bool, EvalError> {
    match op {
        CompareOp::Equals => Ok(lhs == rhs),
        CompareOp::NotEquals => Ok(lhs != rhs),
        CompareOp::GreaterThan => Ok(lhs > rhs),
        CompareOp::LessThan => Ok(lhs < rhs),
        CompareOp::GreaterOrEqual => Ok(lhs >= rhs),
        CompareOp::LessOrEqual => Ok(lhs <= rhs),
        CompareOp::Contains | CompareOp::NotContains => Err(EvalError::UnsupportedOperator {
            op: op.keyword(),
            type_name,
        }),
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
