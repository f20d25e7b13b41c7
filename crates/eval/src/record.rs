//! The transaction record rules read and categorize.
//!
//! Field access is by name, so the rule language stays independent of
//! this ledger model: [`Transaction::get`] and [`Transaction::set`] are
//! the only coupling points with the engine. A name neither knows is the
//! evaluation-time field error.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Errors raised while evaluating rules against a transaction.
///
/// These are per-transaction: the scope is never left corrupted, and a
/// caller processing a batch should report the error and continue with
/// the next transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// A test or action named a field the transaction record does not
    /// expose.
    #[error("transaction has no field named {field:?}")]
    UnknownField { field: String },
    /// The operator is not defined for the field's runtime type.
    #[error("operator `{op}` is not defined for {type_name} fields")]
    UnsupportedOperator {
        op: &'static str,
        type_name: &'static str,
    },
    /// A literal could not be interpreted as the required type.
    #[error("invalid {expected} literal {literal:?}")]
    InvalidLiteral {
        literal: String,
        expected: &'static str,
    },
    /// `apply` was called with a rule-set name the scope does not
    /// contain.
    #[error("unknown rule-set {name:?}")]
    UnknownRuleSet { name: String },
    /// A reference failed to look up at evaluation time. The resolver
    /// validates every reference, so this is a sequencing bug in the
    /// caller, not bad rule data.
    #[error("unresolved reference {ident}: scope was evaluated without resolution")]
    UnresolvedReference { ident: String },
    /// Chained references or rule-set delegations exceeded the depth
    /// limit; the rule document almost certainly contains a reference
    /// cycle.
    #[error("evaluation exceeded {limit} chained references; rule-set references may form a cycle")]
    RecursionLimit { limit: usize },
}

// ──────────────────────────────────────────────
// Transaction record
// ──────────────────────────────────────────────

/// Categorical transaction tag, as assigned by statement ingestion or by
/// rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    #[default]
    Unknown,
    Transfer,
    Receive,
    Spend,
    Trade,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Unknown => "unknown",
            TransactionType::Transfer => "transfer",
            TransactionType::Receive => "receive",
            TransactionType::Spend => "spend",
            TransactionType::Trade => "trade",
        }
    }

    /// Parse the surface keyword used in rule expressions.
    pub fn parse(text: &str) -> Option<TransactionType> {
        match text {
            "unknown" => Some(TransactionType::Unknown),
            "transfer" => Some(TransactionType::Transfer),
            "receive" => Some(TransactionType::Receive),
            "spend" => Some(TransactionType::Spend),
            "trade" => Some(TransactionType::Trade),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ledger transaction as the rules engine sees it.
///
/// `credit_account` / `debit_account` hold account categories; assigning
/// them is how rules categorize a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub description: String,
    #[serde(default)]
    pub user_description: Option<String>,
    #[serde(rename = "type", default)]
    pub tx_type: TransactionType,
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
    pub amount: Decimal,
    #[serde(default)]
    pub credit_account: Option<String>,
    #[serde(default)]
    pub debit_account: Option<String>,
    #[serde(default)]
    pub external_ref: Option<String>,
}

/// A field value read off a transaction. `Absent` is an optional field
/// with no value; comparisons treat it as matching nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Amount(Decimal),
    Time(OffsetDateTime),
    Absent,
}

impl FieldValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Amount(_) => "amount",
            FieldValue::Time(_) => "time",
            FieldValue::Absent => "absent",
        }
    }
}

impl Transaction {
    /// Read a field by its rule-language name.
    pub fn get(&self, field: &str) -> Result<FieldValue, EvalError> {
        let value = match field {
            "desc" | "description" => FieldValue::Text(self.description.clone()),
            "user_description" => opt_text(&self.user_description),
            "type" => FieldValue::Text(self.tx_type.as_str().to_string()),
            "time" => FieldValue::Time(self.time),
            "amount" => FieldValue::Amount(self.amount),
            "credit_account" => opt_text(&self.credit_account),
            "debit_account" => opt_text(&self.debit_account),
            "external_ref" => opt_text(&self.external_ref),
            _ => {
                return Err(EvalError::UnknownField {
                    field: field.to_string(),
                })
            }
        };
        Ok(value)
    }

    /// Assign a field from a literal's source text.
    ///
    /// The literal is converted to the field's type first; a literal
    /// that does not fit fails the assignment instead of storing
    /// mistyped data.
    pub fn set(&mut self, field: &str, literal: &str) -> Result<(), EvalError> {
        match field {
            "desc" | "description" => self.description = literal.to_string(),
            "user_description" => self.user_description = Some(literal.to_string()),
            "type" => {
                self.tx_type =
                    TransactionType::parse(literal).ok_or_else(|| EvalError::InvalidLiteral {
                        literal: literal.to_string(),
                        expected: "transaction type",
                    })?;
            }
            "time" => {
                self.time = match parse_time_literal(literal)? {
                    TimeLiteral::Day(day) => day.midnight().assume_utc(),
                    TimeLiteral::Instant(instant) => instant,
                };
            }
            "amount" => self.amount = parse_amount_literal(literal)?,
            "credit_account" => self.credit_account = Some(literal.to_string()),
            "debit_account" => self.debit_account = Some(literal.to_string()),
            "external_ref" => self.external_ref = Some(literal.to_string()),
            _ => {
                return Err(EvalError::UnknownField {
                    field: field.to_string(),
                })
            }
        }
        Ok(())
    }
}

fn opt_text(value: &Option<String>) -> FieldValue {
    match value {
        Some(text) => FieldValue::Text(text.clone()),
        None => FieldValue::Absent,
    }
}

// ──────────────────────────────────────────────
// Literal interpretation
// ──────────────────────────────────────────────

/// A time literal from a rule expression: a bare ISO date compares
/// against the transaction's calendar date, a full RFC 3339 timestamp
/// against the instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimeLiteral {
    Day(Date),
    Instant(OffsetDateTime),
}

pub(crate) fn parse_time_literal(literal: &str) -> Result<TimeLiteral, EvalError> {
    if let Ok(instant) = OffsetDateTime::parse(literal, &Rfc3339) {
        return Ok(TimeLiteral::Instant(instant));
    }
    let date_format = format_description!("[year]-[month]-[day]");
    match Date::parse(literal, date_format) {
        Ok(day) => Ok(TimeLiteral::Day(day)),
        Err(_) => Err(EvalError::InvalidLiteral {
            literal: literal.to_string(),
            expected: "time",
        }),
    }
}

pub(crate) fn parse_amount_literal(literal: &str) -> Result<Decimal, EvalError> {
    literal
        .trim()
        .parse::<Decimal>()
        .map_err(|_| EvalError::InvalidLiteral {
            literal: literal.to_string(),
            expected: "amount",
        })
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
