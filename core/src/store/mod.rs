//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Writes go through the repositories in this module, each bound to an
//! explicit connection or transaction handle supplied by the caller.

mod agent;
mod commission;
mod query;
mod retailer;
mod run;
mod transaction;

pub use agent::{Agent, AgentRepository};
pub use commission::CommissionRepository;
pub use retailer::{Retailer, RetailerRepository};
pub use run::{RunRecord, RunRepository, RunStatus};
pub use transaction::{StoredTransaction, TransactionRepository};

use crate::{
    aggregation::CommissionRecord,
    error::{PipelineError, PipelineResult},
    record::AcceptedTransaction,
};
use rusqlite::{types::Type, Connection, OpenFlags, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, str::FromStr};

/// The sub-steps of a save, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStep {
    Agents,
    Retailers,
    Transactions,
    Commissions,
}

impl SaveStep {
    pub const ALL: [SaveStep; 4] = [
        SaveStep::Agents,
        SaveStep::Retailers,
        SaveStep::Transactions,
        SaveStep::Commissions,
    ];
}

impl fmt::Display for SaveStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SaveStep::Agents       => "agents",
            SaveStep::Retailers    => "retailers",
            SaveStep::Transactions => "transactions",
            SaveStep::Commissions  => "commissions",
        })
    }
}

/// Commit granularity of `PipelineStore::save`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveMode {
    /// One database transaction around all four steps.
    #[default]
    Atomic,
    /// Commit after every step; a failure rolls back only the failing step.
    Checkpointed,
}

impl FromStr for SaveMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "atomic" => Ok(SaveMode::Atomic),
            "checkpointed" => Ok(SaveMode::Checkpointed),
            other => Err(anyhow::anyhow!("unknown save mode '{other}'").into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveSummary {
    pub agents_created: usize,
    pub retailers_created: usize,
    pub transactions_inserted: usize,
    pub commissions_deleted: usize,
    pub commissions_written: usize,
}

/// One run's worth of rows to persist.
struct SaveBatch<'a> {
    run_id: &'a str,
    transactions: &'a [AcceptedTransaction],
    commissions: &'a [CommissionRecord],
}

impl SaveBatch<'_> {
    fn apply(&self, conn: &Connection, step: SaveStep, summary: &mut SaveSummary) -> PipelineResult<()> {
        self.apply_step(conn, step, summary)
            .map_err(|err| match err {
                PipelineError::Database(source) => PipelineError::Store { step, source },
                other => other,
            })
    }

    fn apply_step(&self, conn: &Connection, step: SaveStep, summary: &mut SaveSummary) -> PipelineResult<()> {
        match step {
            SaveStep::Agents => {
                let repo = AgentRepository::new(conn);
                let ids: BTreeSet<&str> = self.transactions.iter().map(|t| t.agent_id.as_str()).collect();
                for id in &ids {
                    if repo.ensure(id)? {
                        summary.agents_created += 1;
                    }
                }
                log::debug!("Saved {} agents ({} new)", ids.len(), summary.agents_created);
            }
            SaveStep::Retailers => {
                let repo = RetailerRepository::new(conn);
                let ids: BTreeSet<&str> = self.transactions.iter().map(|t| t.retailer_id.as_str()).collect();
                for id in &ids {
                    if repo.ensure(id)? {
                        summary.retailers_created += 1;
                    }
                }
                log::debug!("Saved {} retailers ({} new)", ids.len(), summary.retailers_created);
            }
            SaveStep::Transactions => {
                let repo = TransactionRepository::new(conn);
                for txn in self.transactions {
                    repo.append(self.run_id, txn)?;
                }
                summary.transactions_inserted = self.transactions.len();
                log::debug!("Saved {} transactions", self.transactions.len());
            }
            SaveStep::Commissions => {
                let repo = CommissionRepository::new(conn);
                summary.commissions_deleted = repo.replace_all(self.commissions)?;
                summary.commissions_written = self.commissions.len();
                log::debug!(
                    "Replaced {} commission records with {}",
                    summary.commissions_deleted,
                    summary.commissions_written
                );
            }
        }
        Ok(())
    }
}

pub struct PipelineStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl PipelineStore {
    /// Open (or create) the pipeline database at `path`.
    pub fn open(path: &str) -> PipelineResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        log::info!("Connected to database: {path}");
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an existing database for reading only. Never creates a file.
    pub fn open_read_only(path: &str) -> PipelineResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        log::info!("Connected to database (read-only): {path}");
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> PipelineResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Create any missing tables. Safe to call on every run.
    pub fn migrate(&self) -> PipelineResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_sales_schema.sql"))?;
        Ok(())
    }

    /// Location of the database file; `None` for in-memory stores.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Raw connection handle, for tooling and tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // ── Repositories on the autocommit connection ──────────────

    pub fn agents(&self) -> AgentRepository<'_> {
        AgentRepository::new(&self.conn)
    }

    pub fn retailers(&self) -> RetailerRepository<'_> {
        RetailerRepository::new(&self.conn)
    }

    pub fn transactions(&self) -> TransactionRepository<'_> {
        TransactionRepository::new(&self.conn)
    }

    pub fn commissions(&self) -> CommissionRepository<'_> {
        CommissionRepository::new(&self.conn)
    }

    pub fn runs(&self) -> RunRepository<'_> {
        RunRepository::new(&self.conn)
    }

    // ── Save ───────────────────────────────────────────────────

    /// Persist one batch: agents, retailers, transactions, commissions.
    ///
    /// With `SaveMode::Atomic` nothing is written unless every step
    /// succeeds. With `SaveMode::Checkpointed` each step commits on its
    /// own, so earlier steps stay durable when a later one fails.
    pub fn save(
        &mut self,
        run_id: &str,
        transactions: &[AcceptedTransaction],
        commissions: &[CommissionRecord],
        mode: SaveMode,
    ) -> PipelineResult<SaveSummary> {
        log::info!("Starting database save ({mode:?})...");
        let batch = SaveBatch { run_id, transactions, commissions };
        let mut summary = SaveSummary::default();

        let result = match mode {
            SaveMode::Atomic => self.save_atomic(&batch, &mut summary),
            SaveMode::Checkpointed => self.save_checkpointed(&batch, &mut summary),
        };
        match result {
            Ok(()) => {
                log::info!("All data saved successfully");
                Ok(summary)
            }
            Err(e) => {
                log::error!("Database save failed: {e}");
                Err(e)
            }
        }
    }

    fn save_atomic(&mut self, batch: &SaveBatch<'_>, summary: &mut SaveSummary) -> PipelineResult<()> {
        let tx = self.conn.transaction()?;
        for step in SaveStep::ALL {
            batch.apply(&tx, step, summary)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn save_checkpointed(&mut self, batch: &SaveBatch<'_>, summary: &mut SaveSummary) -> PipelineResult<()> {
        for step in SaveStep::ALL {
            let tx = self.conn.transaction()?;
            batch.apply(&tx, step, summary)?;
            tx.commit()
                .map_err(|source| PipelineError::Store { step, source })?;
            log::debug!("Checkpoint committed after {step} step");
        }
        Ok(())
    }
}

/// Read an exact decimal stored as text.
pub(crate) fn decimal_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
