use crate::{error::PipelineResult, types::RunId};
use chrono::{DateTime, Utc};
use rusqlite::{
    params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
    Connection, OptionalExtension, Row, ToSql,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
}

impl RunStatus {
    fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::Failed    => "failed",
        }
    }
}

impl ToSql for RunStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for RunStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            other => Err(FromSqlError::Other(format!("unknown run status '{other}'").into())),
        }
    }
}

/// Audit row describing one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunRecord {
    pub run_id: RunId,
    pub source: String,
    pub status: RunStatus,
    pub accepted_rows: i64,
    pub rejected_rows: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub error: Option<String>,
}

pub struct RunRepository<'c> {
    conn: &'c Connection,
}

impl<'c> RunRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn record(&self, run: &RunRecord) -> PipelineResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO pipeline_run
                (run_id, source, status, accepted_rows, rejected_rows, started_at, finished_at, error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                run.run_id,
                run.source,
                run.status,
                run.accepted_rows,
                run.rejected_rows,
                run.started_at,
                run.finished_at,
                run.error,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, run_id: &str) -> PipelineResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT run_id, source, status, accepted_rows, rejected_rows, started_at, finished_at, error
                 FROM pipeline_run WHERE run_id = ?1",
                params![run_id],
                run_row,
            )
            .optional()?;
        Ok(run)
    }

    pub fn all(&self) -> PipelineResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, source, status, accepted_rows, rejected_rows, started_at, finished_at, error
             FROM pipeline_run ORDER BY started_at ASC",
        )?;
        let rows = stmt.query_map([], run_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

fn run_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        run_id: row.get(0)?,
        source: row.get(1)?,
        status: row.get(2)?,
        accepted_rows: row.get(3)?,
        rejected_rows: row.get(4)?,
        started_at: row.get(5)?,
        finished_at: row.get(6)?,
        error: row.get(7)?,
    })
}
