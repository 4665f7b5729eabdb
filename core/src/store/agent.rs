use crate::{error::PipelineResult, types::AgentId};
use rusqlite::{params, Connection};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Agent {
    pub agent_id: AgentId,
}

pub struct AgentRepository<'c> {
    conn: &'c Connection,
}

impl<'c> AgentRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Create the agent unless it already exists. Returns true if created.
    pub fn ensure(&self, agent_id: &str) -> PipelineResult<bool> {
        let inserted = self.conn.execute(
            "INSERT INTO agents (agent_id) VALUES (?1) ON CONFLICT(agent_id) DO NOTHING",
            params![agent_id],
        )?;
        Ok(inserted > 0)
    }

    pub fn exists(&self, agent_id: &str) -> PipelineResult<bool> {
        let found: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM agents WHERE agent_id = ?1",
            params![agent_id],
            |row| row.get(0),
        )?;
        Ok(found > 0)
    }

    pub fn count(&self) -> PipelineResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM agents", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn all(&self) -> PipelineResult<Vec<Agent>> {
        let mut stmt = self
            .conn
            .prepare("SELECT agent_id FROM agents ORDER BY agent_id ASC")?;
        let rows = stmt.query_map([], |row| Ok(Agent { agent_id: row.get(0)? }))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
