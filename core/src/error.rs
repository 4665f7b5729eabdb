use crate::{pipeline::PipelineState, store::SaveStep};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Source not found: {path}: {source}")]
    SourceNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed feed: {reason}")]
    MalformedFeed { reason: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Store error during {step} step: {source}")]
    Store {
        step: SaveStep,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stored amounts for {scope} overflow a decimal total")]
    AmountOverflow { scope: String },

    #[error("Invalid pipeline transition: {from} -> {to}")]
    InvalidTransition { from: PipelineState, to: PipelineState },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        PipelineError::MalformedFeed { reason: reason.into() }
    }

    /// True for failures raised by the persistence layer.
    pub fn is_store_error(&self) -> bool {
        matches!(self, PipelineError::Store { .. } | PipelineError::Database(_))
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
