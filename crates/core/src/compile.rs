//! Document compiler: nested YAML documents to an unresolved [`Scope`].
//!
//! The document root maps rule-set names to rule-set bodies; a body has
//! optional `tests`, `actions`, and `rules` sections. Leaf strings go
//! through the expression parser; structural combinators (`and`, `or`,
//! `not`, list = implicit `and`) are interpreted recursively.
//!
//! Compilation performs no reference binding: references stay as
//! identifiers in the AST until [`resolve_references`] runs.
//!
//! [`resolve_references`]: crate::resolve::resolve_references

use serde_yaml::Value;

use crate::ast::{Action, Rule, RuleSet, Scope, Test};
use crate::error::CompileError;
use crate::parser;

/// Compile a YAML rules document into a [`Scope`].
pub fn compile_rules(src: &str) -> Result<Scope, CompileError> {
    let doc: Value = serde_yaml::from_str(src)?;
    compile_document(&doc)
}

/// Compile an already-loaded document. The root must be a mapping from
/// rule-set name to rule-set body.
pub fn compile_document(doc: &Value) -> Result<Scope, CompileError> {
    let root = doc.as_mapping().ok_or(CompileError::RootShape)?;
    let mut scope = Scope::default();
    for (key, body) in root {
        let name = key.as_str().ok_or(CompileError::RuleSetName)?;
        if scope.rule_set(name).is_some() {
            return Err(CompileError::DuplicateRuleSet {
                name: name.to_string(),
            });
        }
        scope.rulesets.push(compile_rule_set(name, body)?);
    }
    Ok(scope)
}

/// Compile one rule-set body: optional `tests`, `actions`, and `rules`
/// mappings, populated in that order. All three sections are optional;
/// an empty rule-set is valid.
pub fn compile_rule_set(name: &str, doc: &Value) -> Result<RuleSet, CompileError> {
    compile_rule_set_body(name, doc).map_err(|source| CompileError::InRuleSet {
        name: name.to_string(),
        source: Box::new(source),
    })
}

fn compile_rule_set_body(name: &str, doc: &Value) -> Result<RuleSet, CompileError> {
    let mut rule_set = RuleSet::new(name);
    if doc.is_null() {
        return Ok(rule_set);
    }
    if doc.as_mapping().is_none() {
        return Err(shape(
            "body",
            "must be a mapping with optional `tests`, `actions`, and `rules` keys",
        ));
    }

    if let Some(section) = doc.get("tests").filter(|v| !v.is_null()) {
        for (member, member_doc) in section_members("tests", section)? {
            let test = compile_test_at(&format!("tests.{member}"), member_doc)?;
            rule_set.tests.push((member.to_string(), test));
        }
    }

    if let Some(section) = doc.get("actions").filter(|v| !v.is_null()) {
        for (member, member_doc) in section_members("actions", section)? {
            let action = compile_action_at(&format!("actions.{member}"), member_doc)?;
            rule_set.actions.push((member.to_string(), action));
        }
    }

    if let Some(section) = doc.get("rules").filter(|v| !v.is_null()) {
        for (member, member_doc) in section_members("rules", section)? {
            let rule = compile_rule_at(&format!("rules.{member}"), member_doc)?;
            rule_set.rules.push((member.to_string(), rule));
        }
    }

    Ok(rule_set)
}

/// Compile a single test document: a string goes through the expression
/// parser, a list is an implicit `and`, a one-key mapping selects a
/// combinator.
pub fn compile_test(doc: &Value) -> Result<Test, CompileError> {
    compile_test_at("test", doc)
}

/// Compile a single action document: a string goes through the expression
/// parser, a list is a sequence.
pub fn compile_action(doc: &Value) -> Result<Action, CompileError> {
    compile_action_at("action", doc)
}

/// Compile a rule document: a mapping with required `test` and `then`
/// keys.
pub fn compile_rule(name: &str, doc: &Value) -> Result<Rule, CompileError> {
    compile_rule_at(name, doc)
}

// ──────────────────────────────────────────────
// Recursive document walkers
// ──────────────────────────────────────────────

fn compile_test_at(item: &str, doc: &Value) -> Result<Test, CompileError> {
    match doc {
        Value::Sequence(elems) => {
            let mut tests = Vec::with_capacity(elems.len());
            for (i, elem) in elems.iter().enumerate() {
                tests.push(compile_test_at(&format!("{item}[{i}]"), elem)?);
            }
            Ok(Test::All(tests))
        }
        Value::Mapping(map) => {
            let mut entries = map.iter();
            let (key, value) = match (entries.next(), entries.next()) {
                (Some(entry), None) => entry,
                _ => {
                    return Err(shape(
                        item,
                        "combinator mapping must have exactly one of `and`, `or`, `not`",
                    ));
                }
            };
            match key.as_str() {
                Some("and") => Ok(Test::All(compile_test_list(item, "and", value)?)),
                Some("or") => Ok(Test::Any(compile_test_list(item, "or", value)?)),
                Some("not") => Ok(Test::Not(Box::new(compile_test_at(
                    &format!("{item}.not"),
                    value,
                )?))),
                _ => {
                    let shown = key.as_str().unwrap_or("<non-string>");
                    Err(shape(item, format!("unrecognized combinator {shown:?}")))
                }
            }
        }
        Value::String(expr) => parser::parse_test(expr).map_err(|source| CompileError::Expr {
            item: item.to_string(),
            source,
        }),
        _ => Err(shape(
            item,
            "test must be a string, a list, or an `and`/`or`/`not` mapping",
        )),
    }
}

fn compile_test_list(item: &str, combinator: &str, doc: &Value) -> Result<Vec<Test>, CompileError> {
    let elems = doc
        .as_sequence()
        .ok_or_else(|| shape(item, format!("`{combinator}` expects a list of tests")))?;
    elems
        .iter()
        .enumerate()
        .map(|(i, elem)| compile_test_at(&format!("{item}.{combinator}[{i}]"), elem))
        .collect()
}

fn compile_action_at(item: &str, doc: &Value) -> Result<Action, CompileError> {
    match doc {
        Value::Sequence(elems) => {
            let mut actions = Vec::with_capacity(elems.len());
            for (i, elem) in elems.iter().enumerate() {
                actions.push(compile_action_at(&format!("{item}[{i}]"), elem)?);
            }
            Ok(Action::Seq(actions))
        }
        Value::String(expr) => parser::parse_action(expr).map_err(|source| CompileError::Expr {
            item: item.to_string(),
            source,
        }),
        _ => Err(shape(item, "action must be a string or a list")),
    }
}

fn compile_rule_at(item: &str, doc: &Value) -> Result<Rule, CompileError> {
    if doc.as_mapping().is_none() {
        return Err(shape(item, "rule must be a mapping with `test` and `then`"));
    }
    let test_doc = doc
        .get("test")
        .ok_or_else(|| shape(item, "rule is missing required key `test`"))?;
    let then_doc = doc
        .get("then")
        .ok_or_else(|| shape(item, "rule is missing required key `then`"))?;
    Ok(Rule {
        test: compile_test_at(&format!("{item}.test"), test_doc)?,
        then: compile_action_at(&format!("{item}.then"), then_doc)?,
    })
}

// ──────────────────────────────────────────────
// Rendering back to document form
// ──────────────────────────────────────────────

/// Render a test back to its document form: expression leaves become
/// strings, combinators become the list/mapping shapes `compile_test`
/// accepts. Parser-produced trees round-trip structurally.
pub fn render_test(test: &Test) -> Value {
    match test {
        Test::Field { field, op, operand } => {
            Value::String(format!("{field} {} {}", op.keyword(), operand_text(operand)))
        }
        Test::All(tests) => Value::Sequence(tests.iter().map(render_test).collect()),
        Test::Any(tests) => singleton_mapping(
            "or",
            Value::Sequence(tests.iter().map(render_test).collect()),
        ),
        Test::Not(inner) => singleton_mapping("not", render_test(inner)),
        Test::Ref(ident) => Value::String(ident.to_string()),
    }
}

/// Render an action back to its document form.
pub fn render_action(action: &Action) -> Value {
    match action {
        Action::SetField { field, value } => {
            Value::String(format!("set {field} to {}", operand_text(value)))
        }
        Action::Seq(actions) => Value::Sequence(actions.iter().map(render_action).collect()),
        Action::UseRuleSet(ident) => Value::String(format!("use {}", ident.segments()[0])),
        Action::Ref(ident) => Value::String(ident.to_string()),
    }
}

fn operand_text(operand: &crate::ast::Operand) -> String {
    match operand {
        crate::ast::Operand::Literal(text) => text.clone(),
        crate::ast::Operand::Ref(ident) => ident.to_string(),
    }
}

fn singleton_mapping(key: &str, value: Value) -> Value {
    let mut map = serde_yaml::Mapping::new();
    map.insert(Value::String(key.to_string()), value);
    Value::Mapping(map)
}

// ──────────────────────────────────────────────
// Shape helpers
// ──────────────────────────────────────────────

fn section_members<'a>(
    section: &'static str,
    doc: &'a Value,
) -> Result<impl Iterator<Item = (&'a str, &'a Value)>, CompileError> {
    let map = doc
        .as_mapping()
        .ok_or_else(|| shape(section, "section must be a mapping of named members"))?;
    map.iter()
        .map(|(key, value)| {
            key.as_str()
                .map(|name| (name, value))
                .ok_or_else(|| shape(section, "member names must be strings"))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Vec::into_iter)
}

fn shape(item: &str, message: impl Into<String>) -> CompileError {
    CompileError::Shape {
        item: item.to_string(),
        message: message.into(),
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
