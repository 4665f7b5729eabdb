use crate::{error::PipelineResult, types::RetailerId};
use rusqlite::{params, Connection};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Retailer {
    pub retailer_id: RetailerId,
}

pub struct RetailerRepository<'c> {
    conn: &'c Connection,
}

impl<'c> RetailerRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Create the retailer unless it already exists. Returns true if created.
    pub fn ensure(&self, retailer_id: &str) -> PipelineResult<bool> {
        let inserted = self.conn.execute(
            "INSERT INTO retailers (retailer_id) VALUES (?1) ON CONFLICT(retailer_id) DO NOTHING",
            params![retailer_id],
        )?;
        Ok(inserted > 0)
    }

    pub fn exists(&self, retailer_id: &str) -> PipelineResult<bool> {
        let found: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM retailers WHERE retailer_id = ?1",
            params![retailer_id],
            |row| row.get(0),
        )?;
        Ok(found > 0)
    }

    pub fn count(&self) -> PipelineResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM retailers", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn all(&self) -> PipelineResult<Vec<Retailer>> {
        let mut stmt = self
            .conn
            .prepare("SELECT retailer_id FROM retailers ORDER BY retailer_id ASC")?;
        let rows = stmt.query_map([], |row| Ok(Retailer { retailer_id: row.get(0)? }))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
