use super::decimal_at;
use crate::{aggregation::CommissionRecord, error::PipelineResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const SELECT_COMMISSION: &str =
    "SELECT agent_id, total_sales, commission_rate, commission_amount FROM commissions";

pub struct CommissionRepository<'c> {
    conn: &'c Connection,
}

impl<'c> CommissionRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Drop the previous snapshot and write `records` in its place.
    /// Returns the number of rows deleted.
    pub fn replace_all(&self, records: &[CommissionRecord]) -> PipelineResult<usize> {
        let deleted = self.conn.execute("DELETE FROM commissions", [])?;
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO commissions (agent_id, total_sales, commission_rate, commission_amount)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for c in records {
            stmt.execute(params![
                c.agent_id,
                c.total_sales.to_string(),
                c.commission_rate.to_string(),
                c.commission_amount.to_string(),
            ])?;
        }
        Ok(deleted)
    }

    pub fn find(&self, agent_id: &str) -> PipelineResult<Option<CommissionRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("{SELECT_COMMISSION} WHERE agent_id = ?1"),
                params![agent_id],
                commission_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn all(&self) -> PipelineResult<Vec<CommissionRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COMMISSION} ORDER BY agent_id ASC"))?;
        let rows = stmt.query_map([], commission_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn count(&self) -> PipelineResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM commissions", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn commission_row(row: &Row<'_>) -> rusqlite::Result<CommissionRecord> {
    Ok(CommissionRecord {
        agent_id: row.get(0)?,
        total_sales: decimal_at(row, 1)?,
        commission_rate: decimal_at(row, 2)?,
        commission_amount: decimal_at(row, 3)?,
    })
}
