//! Shared AST types for the tally rule language.
//!
//! These types are produced by the expression parser and the document
//! compiler and consumed by the resolver and the evaluation engine. They
//! live here so those modules can import them without depending on the
//! parser.

use std::fmt;

use crate::error::CompileError;

// ──────────────────────────────────────────────
// Identifiers and operands
// ──────────────────────────────────────────────

/// A reference path: one segment for a local name (`::foo`), two or more
/// for a scoped name (`billing::foo`). Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    segments: Vec<String>,
}

impl Ident {
    pub fn new(segments: Vec<String>) -> Ident {
        debug_assert!(!segments.is_empty(), "identifier path must be non-empty");
        Ident { segments }
    }

    /// A single-segment identifier naming a member of the enclosing
    /// rule-set.
    pub fn local(name: impl Into<String>) -> Ident {
        Ident {
            segments: vec![name.into()],
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_local(&self) -> bool {
        self.segments.len() == 1
    }
}

impl fmt::Display for Ident {
    /// Renders in the reference syntax: `::foo` when local, `a::b` when
    /// scoped.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_local() {
            write!(f, "::{}", self.segments[0])
        } else {
            write!(f, "{}", self.segments.join("::"))
        }
    }
}

/// An operand position in a test or action: an inline literal, kept as
/// its source text and interpreted under the field's runtime type at
/// evaluation time, or a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Literal(String),
    Ref(Ident),
}

// ──────────────────────────────────────────────
// Comparison operators
// ──────────────────────────────────────────────

/// The eight field comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
}

impl CompareOp {
    /// The surface keyword for this operator in test expressions.
    pub fn keyword(self) -> &'static str {
        match self {
            CompareOp::Equals => "is",
            CompareOp::NotEquals => "is not",
            CompareOp::Contains => "contains",
            CompareOp::NotContains => "does not contain",
            CompareOp::GreaterThan => "is greater than",
            CompareOp::LessThan => "is less than",
            CompareOp::GreaterOrEqual => "is at least",
            CompareOp::LessOrEqual => "is at most",
        }
    }

    /// Whether this operator asserts the absence of a match. Negated
    /// operators hold on a field that has no value.
    pub fn is_negated(self) -> bool {
        matches!(self, CompareOp::NotEquals | CompareOp::NotContains)
    }
}

// ──────────────────────────────────────────────
// Tests and actions
// ──────────────────────────────────────────────

/// A predicate over a transaction record. Tests never mutate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Test {
    /// `<field> <op> <value>`
    Field {
        field: String,
        op: CompareOp,
        operand: Operand,
    },
    /// Ordered conjunction; evaluation short-circuits on the first false
    /// child.
    All(Vec<Test>),
    /// Ordered disjunction; evaluation short-circuits on the first true
    /// child.
    Any(Vec<Test>),
    Not(Box<Test>),
    /// A named test, local (`::foo`) or in another rule-set
    /// (`other::foo`).
    Ref(Ident),
}

/// A mutation applied to a transaction record for its side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// `set <field> to <value>`
    SetField { field: String, value: Operand },
    /// Ordered sequence, applied left to right.
    Seq(Vec<Action>),
    /// `use <ruleset>`: evaluate another rule-set against the same
    /// transaction.
    UseRuleSet(Ident),
    /// A named action, local or scoped.
    Ref(Ident),
}

/// A test/action pair. The rule fires when its test is true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub test: Test,
    pub then: Action,
}

// ──────────────────────────────────────────────
// Rule-sets and scope
// ──────────────────────────────────────────────

/// A named bundle of reusable tests, reusable actions, and rules.
///
/// All three sections keep document order. Order is semantic for rules:
/// a rule-set tries them in declaration order and stops at the first
/// match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    pub name: String,
    pub tests: Vec<(String, Test)>,
    pub actions: Vec<(String, Action)>,
    pub rules: Vec<(String, Rule)>,
}

impl RuleSet {
    pub fn new(name: impl Into<String>) -> RuleSet {
        RuleSet {
            name: name.into(),
            tests: Vec::new(),
            actions: Vec::new(),
            rules: Vec::new(),
        }
    }

    pub fn test(&self, name: &str) -> Option<&Test> {
        self.tests.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    pub fn action(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }
}

/// The root compilation unit: every rule-set from one or more compiled
/// documents, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub rulesets: Vec<RuleSet>,
}

impl Scope {
    pub fn rule_set(&self, name: &str) -> Option<&RuleSet> {
        self.rulesets.iter().find(|rs| rs.name == name)
    }

    /// Merge another compiled document into this scope. Rule-set names
    /// must be unique across documents; a collision fails the load.
    pub fn merge(&mut self, other: Scope) -> Result<(), CompileError> {
        for rule_set in other.rulesets {
            if self.rule_set(&rule_set.name).is_some() {
                return Err(CompileError::DuplicateRuleSet {
                    name: rule_set.name,
                });
            }
            self.rulesets.push(rule_set);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ident_renders_reference_syntax() {
        assert_eq!(Ident::local("foo").to_string(), "::foo");
        let scoped = Ident::new(vec!["billing".to_string(), "card".to_string()]);
        assert_eq!(scoped.to_string(), "billing::card");
    }

    #[test]
    fn rule_set_lookup_by_name() {
        let mut rs = RuleSet::new("test");
        rs.tests.push(("foo".to_string(), Test::All(vec![])));
        assert!(rs.test("foo").is_some());
        assert!(rs.test("bar").is_none());
        assert!(rs.action("foo").is_none());
    }

    #[test]
    fn merge_rejects_duplicate_rule_set() {
        let mut scope = Scope::default();
        scope.rulesets.push(RuleSet::new("spend"));

        let mut other = Scope::default();
        other.rulesets.push(RuleSet::new("spend"));

        let err = scope.merge(other).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateRuleSet { name } if name == "spend"));
    }

    #[test]
    fn merge_appends_in_order() {
        let mut scope = Scope::default();
        scope.rulesets.push(RuleSet::new("a"));

        let mut other = Scope::default();
        other.rulesets.push(RuleSet::new("b"));
        other.rulesets.push(RuleSet::new("c"));

        scope.merge(other).unwrap();
        let names: Vec<_> = scope.rulesets.iter().map(|rs| rs.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }
}
