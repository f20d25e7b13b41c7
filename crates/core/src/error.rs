//! Error types for the rule language pipeline, one per phase.
//!
//! Compile- and resolve-time errors are fatal to the whole load: there is
//! no partial scope. Every variant carries enough context to locate the
//! fault (rule-set name, item path, offending expression text).

use thiserror::Error;

/// A malformed test or action expression.
///
/// `offset` is the byte position of the offending substring within
/// `expr`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset} in {expr:?}")]
pub struct ParseError {
    pub expr: String,
    pub offset: usize,
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(expr: &str, offset: usize, message: impl Into<String>) -> ParseError {
        ParseError {
            expr: expr.to_string(),
            offset,
            message: message.into(),
        }
    }
}

/// A malformed rule document.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("rules document is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("rules document root must be a mapping of rule-set names")]
    RootShape,
    #[error("rule-set names must be strings")]
    RuleSetName,
    #[error("duplicate rule-set {name:?}")]
    DuplicateRuleSet { name: String },
    /// An expression string inside the document failed to parse. `item`
    /// is the document path of the expression, e.g. `rules.r1.test`.
    #[error("{item}: {source}")]
    Expr {
        item: String,
        #[source]
        source: ParseError,
    },
    /// The document shape is wrong at `item`: missing required key,
    /// unrecognized combinator, wrong node kind.
    #[error("{item}: {message}")]
    Shape { item: String, message: String },
    /// Wraps any error raised while compiling one rule-set with the
    /// rule-set's name.
    #[error("rule-set {name:?}: {source}")]
    InRuleSet {
        name: String,
        #[source]
        source: Box<CompileError>,
    },
}

/// A reference that does not name any known test, action, or rule-set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("rule-set {ruleset:?}, {item}: reference {ident} names unknown rule-set {target:?}")]
    UnknownRuleSet {
        ruleset: String,
        item: String,
        ident: String,
        target: String,
    },
    #[error("rule-set {ruleset:?}, {item}: no test named {ident} in rule-set {target:?}")]
    UnknownTest {
        ruleset: String,
        item: String,
        ident: String,
        target: String,
    },
    #[error("rule-set {ruleset:?}, {item}: no action named {ident} in rule-set {target:?}")]
    UnknownAction {
        ruleset: String,
        item: String,
        ident: String,
        target: String,
    },
    /// The grammar admits a reference wherever a literal may appear, but
    /// rule documents define no namespace of named values to resolve one
    /// against.
    #[error("rule-set {ruleset:?}, {item}: reference {ident} cannot appear in value position")]
    ValueReference {
        ruleset: String,
        item: String,
        ident: String,
    },
}

/// Compile-or-resolve error from the [`load_rules`](crate::load_rules)
/// entry point.
#[derive(Debug, Error)]
pub enum RulesError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}
