//! Row validation: which raw rows become transactions, and why the
//! others are set aside.

mod common;

use common::{date, dec};
use salespipe_core::record::{validate, RawRecord, RejectReason, Validation, MAX_AMOUNT};

fn cell(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn raw(agent: &str, retailer: &str, amount: &str, day: &str) -> RawRecord {
    RawRecord::from_cells(cell(agent), cell(retailer), cell(amount), cell(day))
}

fn reasons(v: Validation) -> Vec<RejectReason> {
    match v {
        Validation::Rejected(row) => row.reasons,
        Validation::Accepted(t) => panic!("expected rejection, got {t:?}"),
    }
}

#[test]
fn complete_row_is_accepted_with_typed_fields() {
    match validate(2, raw("A001", "R001", "1500.50", "2024-01-15")) {
        Validation::Accepted(t) => {
            assert_eq!(t.agent_id, "A001");
            assert_eq!(t.retailer_id, "R001");
            assert_eq!(t.amount, dec("1500.50"));
            assert_eq!(t.date, date(2024, 1, 15));
        }
        Validation::Rejected(r) => panic!("unexpected rejection: {r:?}"),
    }
}

#[test]
fn each_missing_field_rejects_the_row() {
    assert_eq!(reasons(validate(2, raw("", "R001", "10", "2024-01-01"))), vec![RejectReason::MissingAgentId]);
    assert_eq!(reasons(validate(2, raw("A001", "", "10", "2024-01-01"))), vec![RejectReason::MissingRetailerId]);
    assert_eq!(reasons(validate(2, raw("A001", "R001", "", "2024-01-01"))), vec![RejectReason::MissingAmount]);
    assert_eq!(reasons(validate(2, raw("A001", "R001", "10", ""))), vec![RejectReason::MissingDate]);
}

#[test]
fn non_numeric_amount_is_rejected() {
    assert_eq!(
        reasons(validate(5, raw("A001", "R001", "invalid", "2024-01-01"))),
        vec![RejectReason::InvalidAmount]
    );
}

#[test]
fn unparseable_date_is_rejected() {
    assert_eq!(
        reasons(validate(5, raw("A001", "R001", "10", "not-a-date"))),
        vec![RejectReason::InvalidDate]
    );
}

#[test]
fn whitespace_only_cells_count_as_missing() {
    let record = RawRecord::from_cells(Some("   "), Some("R001"), Some(" 12 "), Some("2024-03-01"));
    assert_eq!(record.agent_id, None);
    assert_eq!(record.amount.as_deref(), Some("12"));
    assert_eq!(reasons(validate(3, record)), vec![RejectReason::MissingAgentId]);
}

#[test]
fn rejection_keeps_line_raw_values_and_every_reason() {
    let record = raw("", "", "abc", "");
    match validate(7, record.clone()) {
        Validation::Rejected(row) => {
            assert_eq!(row.line, 7);
            assert_eq!(row.record, record);
            assert_eq!(
                row.reasons,
                vec![
                    RejectReason::MissingAgentId,
                    RejectReason::MissingRetailerId,
                    RejectReason::InvalidAmount,
                    RejectReason::MissingDate,
                ]
            );
        }
        Validation::Accepted(t) => panic!("expected rejection, got {t:?}"),
    }
}

#[test]
fn negative_and_zero_amounts_are_accepted() {
    assert!(matches!(validate(2, raw("A1", "R1", "-25.00", "2024-01-01")), Validation::Accepted(_)));
    assert!(matches!(validate(2, raw("A1", "R1", "0", "2024-01-01")), Validation::Accepted(_)));
}

#[test]
fn amounts_up_to_the_limit_are_accepted() {
    match validate(2, raw("A1", "R1", "1000000000000000", "2024-01-01")) {
        Validation::Accepted(t) => assert_eq!(t.amount, MAX_AMOUNT),
        Validation::Rejected(r) => panic!("limit amount rejected: {r:?}"),
    }
    assert!(matches!(
        validate(2, raw("A1", "R1", "-1000000000000000", "2024-01-01")),
        Validation::Accepted(_)
    ));
}

#[test]
fn amounts_beyond_the_limit_are_out_of_range() {
    for amount in ["1000000000000000.01", "-1000000000000001", "79228162514264337593543950335", "1e20"] {
        assert_eq!(
            reasons(validate(2, raw("A1", "R1", amount, "2024-01-01"))),
            vec![RejectReason::AmountOutOfRange],
            "amount {amount}"
        );
    }
}

#[test]
fn null_markers_count_as_missing() {
    assert_eq!(
        reasons(validate(2, raw("NA", "NULL", "nan", "N/A"))),
        vec![
            RejectReason::MissingAgentId,
            RejectReason::MissingRetailerId,
            RejectReason::MissingAmount,
            RejectReason::MissingDate,
        ]
    );
}
