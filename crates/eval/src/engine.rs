//! The evaluation engine: applies a resolved rule-set to a transaction.
//!
//! Rules run in declaration order and a rule-set stops at its first
//! match. Tests never mutate; mutation happens only through a matched
//! rule's action, so a failed evaluation leaves at most the transaction
//! partially updated, never the scope.

use tally_core::ast::{Action, Ident, Operand, Test};
use tally_core::resolve::ResolvedScope;

use crate::compare;
use crate::record::{EvalError, Transaction};

/// Upper bound on chained reference hops and rule-set delegations in one
/// evaluation. Reference cycles pass resolution (the resolver checks
/// names, not the reference graph), so the engine bounds the walk
/// instead of overflowing the stack.
pub const MAX_DEPTH: usize = 64;

/// Apply the named rule-set to a transaction.
///
/// Returns true if some rule fired: the first rule whose test passes
/// runs its action and stops the rule-set. When no rule matches, the
/// transaction is left unmodified.
pub fn apply(
    scope: &ResolvedScope,
    ruleset: &str,
    tx: &mut Transaction,
) -> Result<bool, EvalError> {
    let at = scope
        .rule_set_index(ruleset)
        .ok_or_else(|| EvalError::UnknownRuleSet {
            name: ruleset.to_string(),
        })?;
    apply_at(scope, at, tx, 0)
}

fn apply_at(
    scope: &ResolvedScope,
    at: usize,
    tx: &mut Transaction,
    depth: usize,
) -> Result<bool, EvalError> {
    for (_, rule) in &scope.rule_set_at(at).rules {
        if eval_test(scope, at, &rule.test, tx, depth)? {
            run_action(scope, at, &rule.then, tx, depth)?;
            return Ok(true);
        }
    }
    Ok(false)
}

fn eval_test(
    scope: &ResolvedScope,
    at: usize,
    test: &Test,
    tx: &Transaction,
    depth: usize,
) -> Result<bool, EvalError> {
    match test {
        Test::Field { field, op, operand } => {
            let value = tx.get(field)?;
            compare::compare(&value, *op, literal(operand)?)
        }
        Test::All(tests) => {
            for test in tests {
                if !eval_test(scope, at, test, tx, depth)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Test::Any(tests) => {
            for test in tests {
                if eval_test(scope, at, test, tx, depth)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Test::Not(inner) => Ok(!eval_test(scope, at, inner, tx, depth)?),
        Test::Ref(ident) => {
            let (owner, target) = scope
                .find_test(at, ident)
                .ok_or_else(|| unresolved(ident))?;
            eval_test(scope, owner, target, tx, deeper(depth)?)
        }
    }
}

fn run_action(
    scope: &ResolvedScope,
    at: usize,
    action: &Action,
    tx: &mut Transaction,
    depth: usize,
) -> Result<(), EvalError> {
    match action {
        Action::SetField { field, value } => tx.set(field, literal(value)?),
        Action::Seq(actions) => {
            for action in actions {
                run_action(scope, at, action, tx, depth)?;
            }
            Ok(())
        }
        Action::UseRuleSet(ident) => {
            let target = scope.find_rule_set(ident).ok_or_else(|| unresolved(ident))?;
            // The delegated rule-set's own matched flag is discarded;
            // the containing rule already matched.
            apply_at(scope, target, tx, deeper(depth)?)?;
            Ok(())
        }
        Action::Ref(ident) => {
            let (owner, target) = scope
                .find_action(at, ident)
                .ok_or_else(|| unresolved(ident))?;
            run_action(scope, owner, target, tx, deeper(depth)?)
        }
    }
}

/// Resolved operand text. Value-position references are rejected by the
/// resolver, so a reference here means the scope skipped resolution.
fn literal(operand: &Operand) -> Result<&str, EvalError> {
    match operand {
        Operand::Literal(text) => Ok(text),
        Operand::Ref(ident) => Err(unresolved(ident)),
    }
}

fn unresolved(ident: &Ident) -> EvalError {
    EvalError::UnresolvedReference {
        ident: ident.to_string(),
    }
}

fn deeper(depth: usize) -> Result<usize, EvalError> {
    if depth >= MAX_DEPTH {
        Err(EvalError::RecursionLimit { limit: MAX_DEPTH })
    } else {
        Ok(depth + 1)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
