//! Expression parser for the test and action mini-languages.
//!
//! Both sublanguages are single-line:
//!
//! - tests: `<field> <operator> <value>` or a bare reference
//! - actions: `set <field> to <value>`, `use <ruleset>`, or a bare
//!   reference
//!
//! The operator table is an explicit ordered list tried first to last, so
//! a keyword phrase always beats its own prefix (`is not` before `is`,
//! `is at least` before `is`). The value is always the rest of the line,
//! taken verbatim as a literal unless it parses as a reference.

use crate::ast::{Action, CompareOp, Ident, Operand, Test};
use crate::error::ParseError;

/// Operator keywords, longest phrase first.
const OPERATORS: &[(&str, CompareOp)] = &[
    ("does not contain", CompareOp::NotContains),
    ("is greater than", CompareOp::GreaterThan),
    ("is less than", CompareOp::LessThan),
    ("is at least", CompareOp::GreaterOrEqual),
    ("is at most", CompareOp::LessOrEqual),
    ("is not", CompareOp::NotEquals),
    ("contains", CompareOp::Contains),
    ("is", CompareOp::Equals),
];

/// Parse a test expression.
pub fn parse_test(expr: &str) -> Result<Test, ParseError> {
    let (start, body) = trimmed(expr);
    if body.is_empty() {
        return Err(ParseError::new(expr, 0, "empty test expression"));
    }
    if let Some(ident) = try_reference(body) {
        return Ok(Test::Ref(ident));
    }

    let field_end = body
        .find(char::is_whitespace)
        .ok_or_else(|| ParseError::new(expr, start, "expected `<field> <operator> <value>`"))?;
    let field = &body[..field_end];
    if !is_word(field) {
        return Err(ParseError::new(
            expr,
            start,
            format!("invalid field name {field:?}"),
        ));
    }

    let after_field = body[field_end..].trim_start();
    let rest_at = start + body.len() - after_field.len();
    for (keyword, op) in OPERATORS {
        let Some(tail) = after_field.strip_prefix(keyword) else {
            continue;
        };
        if !(tail.is_empty() || tail.starts_with(char::is_whitespace)) {
            continue;
        }
        let value = tail.trim();
        if value.is_empty() {
            return Err(ParseError::new(
                expr,
                rest_at,
                format!("operator `{keyword}` expects a value"),
            ));
        }
        return Ok(Test::Field {
            field: field.to_string(),
            op: *op,
            operand: parse_operand(value),
        });
    }
    Err(ParseError::new(
        expr,
        rest_at,
        format!("unknown operator in {after_field:?}"),
    ))
}

/// Parse an action expression.
pub fn parse_action(expr: &str) -> Result<Action, ParseError> {
    let (start, body) = trimmed(expr);
    if body.is_empty() {
        return Err(ParseError::new(expr, 0, "empty action expression"));
    }
    if let Some(ident) = try_reference(body) {
        return Ok(Action::Ref(ident));
    }
    if let Some(tail) = body.strip_prefix("set") {
        if tail.starts_with(char::is_whitespace) {
            return parse_set_field(expr, start, body, tail);
        }
    }
    if let Some(tail) = body.strip_prefix("use") {
        if tail.starts_with(char::is_whitespace) {
            return parse_use(expr, start, body, tail);
        }
    }
    Err(ParseError::new(
        expr,
        start,
        "expected `set <field> to <value>`, `use <ruleset>`, or a reference",
    ))
}

// ──────────────────────────────────────────────
// Action alternatives
// ──────────────────────────────────────────────

fn parse_set_field(expr: &str, start: usize, body: &str, tail: &str) -> Result<Action, ParseError> {
    let rest = tail.trim_start();
    let rest_at = start + body.len() - rest.len();
    let field_end = rest
        .find(char::is_whitespace)
        .ok_or_else(|| ParseError::new(expr, rest_at, "expected `set <field> to <value>`"))?;
    let field = &rest[..field_end];
    if !is_word(field) {
        return Err(ParseError::new(
            expr,
            rest_at,
            format!("invalid field name {field:?}"),
        ));
    }

    let after_field = rest[field_end..].trim_start();
    let after_at = start + body.len() - after_field.len();
    let value_part = after_field
        .strip_prefix("to")
        .filter(|v| v.is_empty() || v.starts_with(char::is_whitespace))
        .ok_or_else(|| ParseError::new(expr, after_at, "expected `to` after the field name"))?;
    let value = value_part.trim();
    if value.is_empty() {
        return Err(ParseError::new(expr, after_at, "`set` expects a value"));
    }
    Ok(Action::SetField {
        field: field.to_string(),
        value: parse_operand(value),
    })
}

fn parse_use(expr: &str, start: usize, body: &str, tail: &str) -> Result<Action, ParseError> {
    let name = tail.trim();
    let name_at = start + body.len() - tail.trim_start().len();
    if name.is_empty() {
        return Err(ParseError::new(
            expr,
            name_at,
            "`use` expects a rule-set name",
        ));
    }
    if !is_word(name) {
        return Err(ParseError::new(
            expr,
            name_at,
            format!("invalid rule-set name {name:?}"),
        ));
    }
    Ok(Action::UseRuleSet(Ident::local(name)))
}

// ──────────────────────────────────────────────
// References and operands
// ──────────────────────────────────────────────

fn parse_operand(value: &str) -> Operand {
    match try_reference(value) {
        Some(ident) => Operand::Ref(ident),
        None => Operand::Literal(value.to_string()),
    }
}

/// `::name` (local) or `a::b`, `a::b::c` (scoped). Anything else is not
/// a reference and falls back to the enclosing alternative.
fn try_reference(text: &str) -> Option<Ident> {
    if !text.contains("::") {
        return None;
    }
    let (path, local) = match text.strip_prefix("::") {
        Some(rest) => (rest, true),
        None => (text, false),
    };
    let segments: Vec<&str> = path.split("::").collect();
    if local && segments.len() != 1 {
        return None;
    }
    if segments.iter().any(|seg| !is_word(seg)) {
        return None;
    }
    Some(Ident::new(
        segments.into_iter().map(str::to_string).collect(),
    ))
}

// ──────────────────────────────────────────────
// Lexical helpers
// ──────────────────────────────────────────────

fn is_word(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Strip surrounding whitespace, returning the byte offset of the body
/// within the original expression.
fn trimmed(expr: &str) -> (usize, &str) {
    let start = expr.len() - expr.trim_start().len();
    (start, expr.trim())
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
