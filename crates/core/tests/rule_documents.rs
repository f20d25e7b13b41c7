//! Whole-document tests: compile YAML rule documents, merge them, and
//! resolve references across rule-sets.

use tally_core::ast::{Ident, Test};
use tally_core::{compile_rules, load_rules, resolve_references, CompileError, Scope};

#[test]
fn compile_and_resolve_local_references() {
    let scope = load_rules(
        r"
        test:
          tests:
            foo: desc contains foo
          actions:
            foo: set desc to foo
          rules:
            foo:
              test: '::foo'
              then: '::foo'
        ",
    )
    .unwrap();

    let at = scope.rule_set_index("test").unwrap();
    let rule_set = scope.rule_set_at(at);

    // The rule keeps its references as identifiers...
    let rule = rule_set.rule("foo").unwrap();
    assert_eq!(rule.test, Test::Ref(Ident::local("foo")));

    // ...and resolution lands them on the rule-set's own members.
    let (_, target) = scope.find_test(at, &Ident::local("foo")).unwrap();
    assert!(std::ptr::eq(target, rule_set.test("foo").unwrap()));
    let (_, target) = scope.find_action(at, &Ident::local("foo")).unwrap();
    assert!(std::ptr::eq(target, rule_set.action("foo").unwrap()));
}

#[test]
fn resolve_references_across_rule_sets() {
    let scope = load_rules(
        r"
        external:
          tests:
            bar: amount is 0
        test:
          tests:
            foo:
              - external::bar
              - desc contains foo
        ",
    )
    .unwrap();

    let test_at = scope.rule_set_index("test").unwrap();
    let foo = scope.rule_set_at(test_at).test("foo").unwrap();

    let Test::All(children) = foo else {
        panic!("expected an implicit conjunction, got {foo:?}");
    };
    let Test::Ref(ident) = &children[0] else {
        panic!("expected a reference, got {:?}", children[0]);
    };

    let external_at = scope.rule_set_index("external").unwrap();
    let bar = scope.rule_set_at(external_at).test("bar").unwrap();
    let (owner, target) = scope.find_test(test_at, ident).unwrap();
    assert_eq!(owner, external_at);
    assert!(std::ptr::eq(target, bar));
}

#[test]
fn merge_documents_into_one_scope() {
    let mut scope = compile_rules(
        r"
        billing:
          tests:
            card: desc contains CARD
        ",
    )
    .unwrap();
    scope
        .merge(
            compile_rules(
                r"
                spend:
                  rules:
                    r1:
                      test: billing::card
                      then: set credit_account to expenses
                ",
            )
            .unwrap(),
        )
        .unwrap();

    let resolved = resolve_references(scope).unwrap();
    assert!(resolved.rule_set_index("billing").is_some());
    assert!(resolved.rule_set_index("spend").is_some());
}

#[test]
fn merge_rejects_colliding_rule_set_names() {
    let mut scope = compile_rules("spend:\n  tests:\n    a: amount is 1\n").unwrap();
    let err = scope
        .merge(compile_rules("spend:\n  tests:\n    b: amount is 2\n").unwrap())
        .unwrap_err();
    assert!(matches!(err, CompileError::DuplicateRuleSet { name } if name == "spend"));
}

#[test]
fn one_bad_rule_fails_the_whole_load() {
    let err = load_rules(
        r"
        good:
          rules:
            r1:
              test: amount is 1
              then: set desc to ok
        bad:
          rules:
            r1:
              test: desc resembles foo
              then: set desc to broken
        ",
    )
    .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("bad"), "{message}");
    assert!(message.contains("rules.r1.test"), "{message}");
}

#[test]
fn empty_scope_resolves() {
    let scope = resolve_references(Scope::default()).unwrap();
    assert!(scope.scope().rulesets.is_empty());
    assert!(scope.rule_set_index("anything").is_none());
}
