//! tally-core: the tally rule language.
//!
//! A small declarative language for auto-categorizing ledger
//! transactions: rule documents declare named tests (predicates), named
//! actions (mutations), and ordered rules grouped into rule-sets, with
//! references between them (`::local` or `ruleset::name`).
//!
//! The pipeline from a rule document to something evaluable:
//!
//! 1. [`compile_rules`] -- YAML document text to an unresolved [`Scope`]
//! 2. [`Scope::merge`] -- optionally combine several documents
//! 3. [`resolve_references`] -- check every reference and build the
//!    symbol index, yielding a read-only [`ResolvedScope`]
//!
//! [`load_rules`] runs the whole pipeline for the single-document case.
//! Evaluation against transaction records lives in the companion
//! `tally-eval` crate.

pub mod ast;
pub mod compile;
pub mod error;
pub mod parser;
pub mod resolve;

// ── Convenience re-exports: key types ────────────────────────────────

pub use ast::{Action, CompareOp, Ident, Operand, Rule, RuleSet, Scope, Test};
pub use error::{CompileError, ParseError, ResolveError, RulesError};
pub use resolve::ResolvedScope;

// ── Convenience re-exports: pipeline entry points ────────────────────

pub use compile::{compile_document, compile_rules};
pub use resolve::resolve_references;

/// Compile a YAML rules document and resolve every reference in one
/// step.
pub fn load_rules(src: &str) -> Result<ResolvedScope, RulesError> {
    let scope = compile::compile_rules(src)?;
    Ok(resolve::resolve_references(scope)?)
}
