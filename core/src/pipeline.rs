//! The pipeline orchestrator.
//!
//! STAGE ORDER (fixed, single pass):
//!   1. Ingesting: read the feed, validate rows, set rejects aside
//!   2. Aggregating: grouped sums and commissions over accepted rows
//!   3. Persisting: reference upserts, fact append, commission replace
//!
//! RULES:
//!   - Each stage runs to completion before the next starts.
//!   - No stage revisits the feed once ingestion has returned.
//!   - A fatal error in any stage ends the run in `Failed`; nothing retries.

use crate::{
    aggregation::{Aggregation, Aggregator},
    config::PipelineConfig,
    error::{PipelineError, PipelineResult},
    ingestion,
    record::RejectedRow,
    store::{PipelineStore, RunRecord, RunStatus, SaveSummary},
    types::RunId,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Ingesting,
    Aggregating,
    Persisting,
    Completed,
    Failed,
}

impl PipelineState {
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Idle, Ingesting)
                | (Ingesting, Aggregating)
                | (Aggregating, Persisting)
                | (Persisting, Completed)
                | (Ingesting | Aggregating | Persisting, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Completed | PipelineState::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PipelineState::Idle        => "idle",
            PipelineState::Ingesting   => "ingesting",
            PipelineState::Aggregating => "aggregating",
            PipelineState::Persisting  => "persisting",
            PipelineState::Completed   => "completed",
            PipelineState::Failed      => "failed",
        })
    }
}

/// Everything a completed run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub source: String,
    pub accepted_rows: usize,
    pub rejected: Vec<RejectedRow>,
    pub aggregation: Aggregation,
    pub saved: SaveSummary,
}

pub struct Pipeline {
    run_id: RunId,
    config: PipelineConfig,
    state: PipelineState,
    store: PipelineStore,
}

impl Pipeline {
    pub fn new(run_id: RunId, config: PipelineConfig, store: PipelineStore) -> Self {
        Self {
            run_id,
            config,
            state: PipelineState::Idle,
            store,
        }
    }

    /// Build a pipeline with a fresh random run id.
    pub fn with_generated_id(config: PipelineConfig, store: PipelineStore) -> Self {
        Self::new(format!("run-{}", Uuid::new_v4()), config, store)
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &PipelineStore {
        &self.store
    }

    /// Hand the store back, e.g. to run another batch against it.
    pub fn into_store(self) -> PipelineStore {
        self.store
    }

    /// Execute the run. Callable once, from `Idle`.
    pub fn run(&mut self) -> PipelineResult<RunSummary> {
        let started_at = Utc::now();
        self.transition(PipelineState::Ingesting)?;
        log::info!("=== Starting pipeline run {} ===", self.run_id);

        let mut counts = (0usize, 0usize);
        match self.execute(&mut counts) {
            Ok(summary) => {
                self.transition(PipelineState::Completed)?;
                self.record_run(RunStatus::Completed, counts, started_at, None);
                log::info!("=== Pipeline completed successfully ===");
                Ok(summary)
            }
            Err(e) => {
                log::error!("Pipeline failed while {}: {e}", self.state);
                self.state = PipelineState::Failed;
                self.record_run(RunStatus::Failed, counts, started_at, Some(e.to_string()));
                Err(e)
            }
        }
    }

    fn execute(&mut self, counts: &mut (usize, usize)) -> PipelineResult<RunSummary> {
        log::info!("Phase 1: Data Ingestion");
        let report = ingestion::ingest(&self.config.input_path)?;
        *counts = (report.accepted.len(), report.rejected.len());

        self.transition(PipelineState::Aggregating)?;
        log::info!("Phase 2: Data Processing");
        let aggregation = Aggregator::new(&report.accepted, self.config.commission).aggregate();
        log::info!(
            "Aggregated {} agents, {} retailers, {} months",
            aggregation.sales_by_agent.len(),
            aggregation.sales_by_retailer.len(),
            aggregation.monthly_totals.len()
        );

        self.transition(PipelineState::Persisting)?;
        log::info!("Phase 3: Data Storage");
        let saved = self.store.save(
            &self.run_id,
            &report.accepted,
            &aggregation.commissions,
            self.config.save_mode,
        )?;

        Ok(RunSummary {
            run_id: self.run_id.clone(),
            source: self.config.input_path.display().to_string(),
            accepted_rows: report.accepted.len(),
            rejected: report.rejected,
            aggregation,
            saved,
        })
    }

    fn transition(&mut self, next: PipelineState) -> PipelineResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(PipelineError::InvalidTransition { from: self.state, to: next });
        }
        log::debug!("Pipeline {}: {} -> {}", self.run_id, self.state, next);
        self.state = next;
        Ok(())
    }

    /// Audit the outcome. A failure here is logged, never surfaced.
    fn record_run(
        &self,
        status: RunStatus,
        (accepted, rejected): (usize, usize),
        started_at: DateTime<Utc>,
        error: Option<String>,
    ) {
        let record = RunRecord {
            run_id: self.run_id.clone(),
            source: self.config.input_path.display().to_string(),
            status,
            accepted_rows: accepted as i64,
            rejected_rows: rejected as i64,
            started_at,
            finished_at: Utc::now(),
            error,
        };
        if let Err(e) = self.store.runs().record(&record) {
            log::warn!("Could not record run {}: {e}", self.run_id);
        }
    }
}
