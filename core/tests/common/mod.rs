//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use salespipe_core::{record::AcceptedTransaction, store::PipelineStore};
use std::{path::PathBuf, str::FromStr};

pub const SAMPLE_FEED: &str = "\
agent_id,retailer_id,transaction_amount,date
A001,R001,1500,2024-01-15
A001,R002,2500,2024-01-20
A002,R001,3000,2024-02-10
";

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).expect("decimal literal")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn txn(agent: &str, retailer: &str, amount: &str, day: NaiveDate) -> AcceptedTransaction {
    AcceptedTransaction {
        agent_id: agent.to_string(),
        retailer_id: retailer.to_string(),
        amount: dec(amount),
        date: day,
    }
}

/// The three rows of `SAMPLE_FEED`, already validated.
pub fn sample_transactions() -> Vec<AcceptedTransaction> {
    vec![
        txn("A001", "R001", "1500", date(2024, 1, 15)),
        txn("A001", "R002", "2500", date(2024, 1, 20)),
        txn("A002", "R001", "3000", date(2024, 2, 10)),
    ]
}

pub fn migrated_store() -> PipelineStore {
    let store = PipelineStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

/// Write a feed file under a per-process temp directory.
/// `name` must be unique per test.
pub fn write_feed(name: &str, contents: &[u8]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("salespipe-tests-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join(format!("{name}.csv"));
    std::fs::write(&path, contents).expect("write feed");
    path
}

/// Make every insert into `transactions` fail.
pub fn break_transactions_table(store: &PipelineStore) {
    store
        .connection()
        .execute_batch(
            "CREATE TRIGGER reject_transactions BEFORE INSERT ON transactions
             BEGIN SELECT RAISE(ABORT, 'transactions offline'); END;",
        )
        .expect("install trigger");
}
