use super::decimal_at;
use crate::{
    error::PipelineResult,
    record::AcceptedTransaction,
    types::{AgentId, RetailerId, RunId},
};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;

/// A persisted transaction fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredTransaction {
    pub id: i64,
    pub run_id: RunId,
    pub agent_id: AgentId,
    pub retailer_id: RetailerId,
    pub amount: Decimal,
    pub date: NaiveDate,
}

pub struct TransactionRepository<'c> {
    conn: &'c Connection,
}

impl<'c> TransactionRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Insert a new fact row. Facts are never deduplicated.
    pub fn append(&self, run_id: &str, txn: &AcceptedTransaction) -> PipelineResult<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO transactions (run_id, agent_id, retailer_id, transaction_amount, date)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        stmt.execute(params![
            run_id,
            txn.agent_id,
            txn.retailer_id,
            txn.amount.to_string(),
            txn.date,
        ])?;
        Ok(())
    }

    pub fn count(&self) -> PipelineResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn count_for_run(&self, run_id: &str) -> PipelineResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn all(&self) -> PipelineResult<Vec<StoredTransaction>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, agent_id, retailer_id, transaction_amount, date
             FROM transactions ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(StoredTransaction {
                id: row.get(0)?,
                run_id: row.get(1)?,
                agent_id: row.get(2)?,
                retailer_id: row.get(3)?,
                amount: decimal_at(row, 4)?,
                date: row.get(5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
