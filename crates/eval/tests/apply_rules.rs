//! End-to-end scenarios: YAML rule documents compiled, resolved, and
//! applied to transaction records.

use rust_decimal::Decimal;
use tally_core::load_rules;
use tally_eval::{apply, EvalError, Transaction, TransactionType};
use time::macros::datetime;

fn tx(description: &str, amount: &str) -> Transaction {
    Transaction {
        description: description.to_string(),
        user_description: None,
        tx_type: TransactionType::Unknown,
        time: datetime!(2024-01-15 12:00 UTC),
        amount: amount.parse().unwrap(),
        credit_account: None,
        debit_account: None,
        external_ref: None,
    }
}

#[test]
fn match_sets_description() {
    let scope = load_rules(
        r"
        spend_rules:
          rules:
            r1:
              test: amount is 42
              then: set description to matched
        ",
    )
    .unwrap();

    let mut hit = tx("original", "42");
    assert!(apply(&scope, "spend_rules", &mut hit).unwrap());
    assert_eq!(hit.description, "matched");

    let mut miss = tx("original", "10");
    assert!(!apply(&scope, "spend_rules", &mut miss).unwrap());
    assert_eq!(miss.description, "original");
}

#[test]
fn categorize_by_description() {
    let scope = load_rules(
        r"
        categorize:
          tests:
            coffee:
              or:
                - desc contains COFFEE
                - desc contains ESPRESSO
          rules:
            coffee:
              test:
                - '::coffee'
                - type is spend
              then:
                - set credit_account to expenses:food:coffee
                - set user_description to Coffee
        ",
    )
    .unwrap();

    let mut record = tx("COFFEE SHOP 0042", "4.25");
    record.tx_type = TransactionType::Spend;
    assert!(apply(&scope, "categorize", &mut record).unwrap());
    assert_eq!(record.credit_account.as_deref(), Some("expenses:food:coffee"));
    assert_eq!(record.user_description.as_deref(), Some("Coffee"));

    // Same description but not a spend: the conjunction fails.
    let mut transfer = tx("COFFEE SHOP 0042", "4.25");
    transfer.tx_type = TransactionType::Transfer;
    assert!(!apply(&scope, "categorize", &mut transfer).unwrap());
    assert_eq!(transfer.credit_account, None);
}

#[test]
fn shared_tests_resolve_across_rule_sets() {
    let scope = load_rules(
        r"
        common:
          tests:
            large: amount is at least 1000
        alerts:
          rules:
            large_spend:
              test:
                - common::large
                - type is spend
              then: set user_description to Large spend
        ",
    )
    .unwrap();

    let mut record = tx("WIRE OUT", "2500");
    record.tx_type = TransactionType::Spend;
    assert!(apply(&scope, "alerts", &mut record).unwrap());
    assert_eq!(record.user_description.as_deref(), Some("Large spend"));
}

#[test]
fn use_delegates_to_another_rule_set() {
    let scope = load_rules(
        r"
        billing:
          rules:
            card:
              test: desc contains CARD
              then: set credit_account to expenses:card
        spend:
          rules:
            all_spend:
              test: type is spend
              then:
                - use billing
                - set user_description to reviewed
        ",
    )
    .unwrap();

    let mut record = tx("CARD PAYMENT", "12");
    record.tx_type = TransactionType::Spend;
    assert!(apply(&scope, "spend", &mut record).unwrap());
    assert_eq!(record.credit_account.as_deref(), Some("expenses:card"));
    assert_eq!(record.user_description.as_deref(), Some("reviewed"));
}

#[test]
fn use_result_is_discarded() {
    // The delegated rule-set matches nothing, but the containing rule
    // still counts as matched.
    let scope = load_rules(
        r"
        billing:
          rules:
            card:
              test: desc contains CARD
              then: set credit_account to expenses:card
        spend:
          rules:
            all_spend:
              test: type is spend
              then: use billing
        ",
    )
    .unwrap();

    let mut record = tx("WIRE TRANSFER", "12");
    record.tx_type = TransactionType::Spend;
    assert!(apply(&scope, "spend", &mut record).unwrap());
    assert_eq!(record.credit_account, None);
}

#[test]
fn first_match_stops_the_rule_set() {
    let scope = load_rules(
        r"
        ordered:
          rules:
            narrow:
              test: desc contains COFFEE
              then: set credit_account to expenses:food:coffee
            broad:
              test: amount is at least 0
              then: set credit_account to expenses:misc
        ",
    )
    .unwrap();

    let mut record = tx("COFFEE SHOP", "4.25");
    assert!(apply(&scope, "ordered", &mut record).unwrap());
    assert_eq!(record.credit_account.as_deref(), Some("expenses:food:coffee"));
}

#[test]
fn absent_fields_fail_positive_tests_and_pass_negated_ones() {
    let scope = load_rules(
        r"
        uncategorized:
          rules:
            flag:
              test: credit_account is not anything
              then: set user_description to needs category
        ",
    )
    .unwrap();

    let mut record = tx("MYSTERY", "5");
    assert!(apply(&scope, "uncategorized", &mut record).unwrap());
    assert_eq!(record.user_description.as_deref(), Some("needs category"));

    let scope = load_rules(
        r"
        categorized:
          rules:
            flag:
              test: credit_account contains expenses
              then: set user_description to categorized
        ",
    )
    .unwrap();
    let mut record = tx("MYSTERY", "5");
    assert!(!apply(&scope, "categorized", &mut record).unwrap());
}

#[test]
fn time_rules_compare_chronologically() {
    let scope = load_rules(
        r"
        january:
          rules:
            in_january:
              test:
                - time is at least 2024-01-01
                - time is less than 2024-02-01
              then: set user_description to january
        ",
    )
    .unwrap();

    let mut record = tx("ANYTHING", "1");
    assert!(apply(&scope, "january", &mut record).unwrap());
    assert_eq!(record.user_description.as_deref(), Some("january"));

    let mut later = tx("ANYTHING", "1");
    later.time = datetime!(2024-03-01 0:00 UTC);
    assert!(!apply(&scope, "january", &mut later).unwrap());
}

#[test]
fn failed_action_keeps_earlier_mutations() {
    let scope = load_rules(
        r"
        spend:
          rules:
            r1:
              test: amount is 42
              then:
                - set description to partially applied
                - set amount to not a number
        ",
    )
    .unwrap();

    let mut record = tx("original", "42");
    let err = apply(&scope, "spend", &mut record).unwrap_err();
    assert!(matches!(err, EvalError::InvalidLiteral { expected: "amount", .. }));
    // The first action in the sequence stuck.
    assert_eq!(record.description, "partially applied");
    assert_eq!(record.amount, Decimal::from(42));
}

#[test]
fn batch_processing_continues_past_bad_records() {
    let scope = load_rules(
        r"
        spend:
          rules:
            r1:
              test: amount is at least 100
              then: set amount to not a number
            r2:
              test: amount is at least 0
              then: set user_description to ok
        ",
    )
    .unwrap();

    let mut batch = vec![tx("a", "10"), tx("b", "500"), tx("c", "20")];
    let mut failures = 0;
    for record in &mut batch {
        if apply(&scope, "spend", record).is_err() {
            failures += 1;
        }
    }
    assert_eq!(failures, 1);
    assert_eq!(batch[0].user_description.as_deref(), Some("ok"));
    assert_eq!(batch[2].user_description.as_deref(), Some("ok"));
}
