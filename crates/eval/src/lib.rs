//! tally-eval: applies resolved rule scopes to ledger transactions.
//!
//! Consumes `tally-core`'s [`ResolvedScope`](tally_core::ResolvedScope).
//! A rule-set is evaluated first-match-wins against a mutable
//! [`Transaction`]; matching rules categorize the transaction by
//! assigning its fields.
//!
//! The engine is synchronous and side-effect-scoped to the transaction
//! passed in. A resolved scope is immutable, so one scope can serve any
//! number of concurrent [`apply`] calls as long as each call gets its
//! own transaction.

pub mod compare;
pub mod engine;
pub mod record;

pub use engine::{apply, MAX_DEPTH};
pub use record::{EvalError, FieldValue, Transaction, TransactionType};
