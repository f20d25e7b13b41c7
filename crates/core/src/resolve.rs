//! Reference resolution: check every reference in a compiled [`Scope`]
//! and build the symbol index the evaluation engine looks names up in.
//!
//! References stay in the AST as identifiers; resolution produces a
//! [`ResolvedScope`] wrapping the scope together with name-to-position
//! maps. Consuming the scope means resolution happens exactly once, and
//! only a `ResolvedScope` reaches the engine, so an unresolved reference
//! cannot be evaluated. The result is immutable and safe to share across
//! threads for concurrent evaluation.
//!
//! Resolution does not chase the reference graph for cycles; the engine
//! bounds evaluation depth instead.

use std::collections::HashMap;

use crate::ast::{Action, Ident, Operand, RuleSet, Scope, Test};
use crate::error::ResolveError;

/// Which member namespace a reference resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Namespace {
    Tests,
    Actions,
}

/// Member positions for one rule-set.
#[derive(Debug, Default)]
struct MemberIndex {
    tests: HashMap<String, usize>,
    actions: HashMap<String, usize>,
}

/// A scope whose references have all been checked against the symbol
/// index.
#[derive(Debug)]
pub struct ResolvedScope {
    scope: Scope,
    rulesets: HashMap<String, usize>,
    members: Vec<MemberIndex>,
}

impl ResolvedScope {
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Position of the named rule-set, if any.
    pub fn rule_set_index(&self, name: &str) -> Option<usize> {
        self.rulesets.get(name).copied()
    }

    pub fn rule_set_at(&self, index: usize) -> &RuleSet {
        &self.scope.rulesets[index]
    }

    /// Follow a test reference from the given rule-set. Returns the
    /// owning rule-set's position alongside the test so that references
    /// inside the target re-anchor against their own rule-set.
    pub fn find_test(&self, from: usize, ident: &Ident) -> Option<(usize, &Test)> {
        let (owner, position) = self.locate(from, ident.segments(), Namespace::Tests)?;
        let (_, test) = &self.scope.rulesets[owner].tests[position];
        Some((owner, test))
    }

    /// Follow an action reference from the given rule-set.
    pub fn find_action(&self, from: usize, ident: &Ident) -> Option<(usize, &Action)> {
        let (owner, position) = self.locate(from, ident.segments(), Namespace::Actions)?;
        let (_, action) = &self.scope.rulesets[owner].actions[position];
        Some((owner, action))
    }

    /// Follow a rule-set reference (`use <name>`): the identifier's
    /// first segment is looked up directly among the scope's rule-sets.
    pub fn find_rule_set(&self, ident: &Ident) -> Option<usize> {
        self.rulesets.get(&ident.segments()[0]).copied()
    }

    /// A single segment names a member of the rule-set at `from`; with
    /// more segments, each leading segment hops to the rule-set it
    /// names and the final segment is resolved there.
    fn locate(&self, from: usize, path: &[String], namespace: Namespace) -> Option<(usize, usize)> {
        match path {
            [] => None,
            [name] => {
                let members = &self.members[from];
                let map = match namespace {
                    Namespace::Tests => &members.tests,
                    Namespace::Actions => &members.actions,
                };
                map.get(name).map(|&position| (from, position))
            }
            [hop, rest @ ..] => {
                let next = *self.rulesets.get(hop)?;
                self.locate(next, rest, namespace)
            }
        }
    }
}

/// Check every reference in the scope and build the symbol index.
///
/// Rule-sets are visited in stored order; within one, tests, then
/// actions, then rules. Lookups are against the fully-populated index,
/// so resolution of any one reference does not depend on traversal
/// order. Fails with the first reference that names nothing.
pub fn resolve_references(scope: Scope) -> Result<ResolvedScope, ResolveError> {
    let mut rulesets = HashMap::new();
    let mut members = Vec::with_capacity(scope.rulesets.len());
    for (position, rule_set) in scope.rulesets.iter().enumerate() {
        rulesets.insert(rule_set.name.clone(), position);
        let mut index = MemberIndex::default();
        for (p, (name, _)) in rule_set.tests.iter().enumerate() {
            index.tests.insert(name.clone(), p);
        }
        for (p, (name, _)) in rule_set.actions.iter().enumerate() {
            index.actions.insert(name.clone(), p);
        }
        members.push(index);
    }

    let resolved = ResolvedScope {
        scope,
        rulesets,
        members,
    };

    for (position, rule_set) in resolved.scope.rulesets.iter().enumerate() {
        let walk = Walk {
            scope: &resolved,
            from: position,
        };
        for (name, test) in &rule_set.tests {
            walk.check_test(&format!("tests.{name}"), test)?;
        }
        for (name, action) in &rule_set.actions {
            walk.check_action(&format!("actions.{name}"), action)?;
        }
        for (name, rule) in &rule_set.rules {
            walk.check_test(&format!("rules.{name}.test"), &rule.test)?;
            walk.check_action(&format!("rules.{name}.then"), &rule.then)?;
        }
    }

    Ok(resolved)
}

/// Traversal state for one rule-set: explicit per-variant dispatch over
/// the node types, reporting the first dangling reference.
struct Walk<'a> {
    scope: &'a ResolvedScope,
    from: usize,
}

impl Walk<'_> {
    fn rule_set_name(&self) -> &str {
        &self.scope.scope.rulesets[self.from].name
    }

    fn check_test(&self, item: &str, test: &Test) -> Result<(), ResolveError> {
        match test {
            Test::Field { operand, .. } => self.check_operand(item, operand),
            Test::All(tests) | Test::Any(tests) => {
                for test in tests {
                    self.check_test(item, test)?;
                }
                Ok(())
            }
            Test::Not(inner) => self.check_test(item, inner),
            Test::Ref(ident) => self.check_path(item, ident, Namespace::Tests),
        }
    }

    fn check_action(&self, item: &str, action: &Action) -> Result<(), ResolveError> {
        match action {
            Action::SetField { value, .. } => self.check_operand(item, value),
            Action::Seq(actions) => {
                for action in actions {
                    self.check_action(item, action)?;
                }
                Ok(())
            }
            Action::UseRuleSet(ident) => {
                if self.scope.find_rule_set(ident).is_none() {
                    return Err(ResolveError::UnknownRuleSet {
                        ruleset: self.rule_set_name().to_string(),
                        item: item.to_string(),
                        ident: ident.to_string(),
                        target: ident.segments()[0].clone(),
                    });
                }
                Ok(())
            }
            Action::Ref(ident) => self.check_path(item, ident, Namespace::Actions),
        }
    }

    fn check_operand(&self, item: &str, operand: &Operand) -> Result<(), ResolveError> {
        match operand {
            Operand::Literal(_) => Ok(()),
            Operand::Ref(ident) => Err(ResolveError::ValueReference {
                ruleset: self.rule_set_name().to_string(),
                item: item.to_string(),
                ident: ident.to_string(),
            }),
        }
    }

    fn check_path(&self, item: &str, ident: &Ident, namespace: Namespace) -> Result<(), ResolveError> {
        let path = ident.segments();
        let mut at = self.from;
        for hop in &path[..path.len() - 1] {
            at = match self.scope.rulesets.get(hop) {
                Some(&next) => next,
                None => {
                    return Err(ResolveError::UnknownRuleSet {
                        ruleset: self.rule_set_name().to_string(),
                        item: item.to_string(),
                        ident: ident.to_string(),
                        target: hop.clone(),
                    });
                }
            };
        }

        let leaf = &path[path.len() - 1];
        let members = &self.scope.members[at];
        let found = match namespace {
            Namespace::Tests => members.tests.contains_key(leaf),
            Namespace::Actions => members.actions.contains_key(leaf),
        };
        if found {
            return Ok(());
        }
        let target = self.scope.scope.rulesets[at].name.clone();
        Err(match namespace {
            Namespace::Tests => ResolveError::UnknownTest {
                ruleset: self.rule_set_name().to_string(),
                item: item.to_string(),
                ident: ident.to_string(),
                target,
            },
            Namespace::Actions => ResolveError::UnknownAction {
                ruleset: self.rule_set_name().to_string(),
                item: item.to_string(),
                ident: ident.to_string(),
                target,
            },
        })
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
