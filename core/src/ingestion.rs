//! Feed reader: loads the delimited feed, validates every row and
//! returns only accepted transactions. Rejected rows travel alongside
//! for audit and are never an error.

use crate::{
    error::{PipelineError, PipelineResult},
    record::{validate, AcceptedTransaction, RawRecord, RejectedRow, Validation},
};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use std::{fs::File, io::Read, path::Path};

/// The declared columns of the feed, in canonical order.
pub const FEED_COLUMNS: [&str; 4] = ["agent_id", "retailer_id", "transaction_amount", "date"];

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub accepted: Vec<AcceptedTransaction>,
    pub rejected: Vec<RejectedRow>,
}

impl IngestReport {
    pub fn total_rows(&self) -> usize {
        self.accepted.len() + self.rejected.len()
    }
}

/// Positions of the feed columns within the header.
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    agent_id: usize,
    retailer_id: usize,
    amount: usize,
    date: usize,
    width: usize,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> PipelineResult<Self> {
        if headers.is_empty() {
            return Err(PipelineError::malformed("feed has no header row"));
        }

        let mut positions = [None; 4];
        for (idx, name) in headers.iter().enumerate() {
            let Some(slot) = FEED_COLUMNS.iter().position(|c| *c == name) else {
                return Err(PipelineError::malformed(format!("unexpected column '{name}'")));
            };
            if positions[slot].replace(idx).is_some() {
                return Err(PipelineError::malformed(format!("duplicate column '{name}'")));
            }
        }

        let missing: Vec<&str> = FEED_COLUMNS
            .iter()
            .zip(positions.iter())
            .filter(|(_, pos)| pos.is_none())
            .map(|(name, _)| *name)
            .collect();
        match positions {
            [Some(agent_id), Some(retailer_id), Some(amount), Some(date)] => Ok(Self {
                agent_id,
                retailer_id,
                amount,
                date,
                width: headers.len(),
            }),
            _ => Err(PipelineError::malformed(format!(
                "missing required columns: {}",
                missing.join(", ")
            ))),
        }
    }

    fn raw_record(&self, row: &StringRecord) -> RawRecord {
        RawRecord::from_cells(
            row.get(self.agent_id),
            row.get(self.retailer_id),
            row.get(self.amount),
            row.get(self.date),
        )
    }
}

/// Read and validate the feed at `path`.
pub fn ingest(path: impl AsRef<Path>) -> PipelineResult<IngestReport> {
    let path = path.as_ref();
    log::info!("Reading feed: {}", path.display());

    let not_found = |source: std::io::Error| PipelineError::SourceNotFound {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(not_found)?;
    if !file.metadata().map_err(not_found)?.is_file() {
        return Err(not_found(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }

    ingest_reader(file)
}

/// Read and validate a feed from any byte source.
pub fn ingest_reader<R: Read>(input: R) -> PipelineResult<IngestReport> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input);

    let headers = reader.headers().map_err(feed_error)?.clone();
    let columns = ColumnMap::from_headers(&headers)?;

    let mut report = IngestReport::default();
    for result in reader.records() {
        let row = result.map_err(feed_error)?;
        let line = row.position().map(|p| p.line()).unwrap_or_default();
        if row.len() > columns.width {
            return Err(PipelineError::malformed(format!(
                "line {line}: expected {} fields, found {}",
                columns.width,
                row.len()
            )));
        }

        match validate(line, columns.raw_record(&row)) {
            Validation::Accepted(txn) => report.accepted.push(txn),
            Validation::Rejected(rejected) => report.rejected.push(rejected),
        }
    }

    log::info!(
        "Validation complete: {} valid, {} invalid",
        report.accepted.len(),
        report.rejected.len()
    );
    for rejected in &report.rejected {
        log_rejected(rejected);
    }
    Ok(report)
}

fn log_rejected(rejected: &RejectedRow) {
    let reasons: Vec<String> = rejected.reasons.iter().map(ToString::to_string).collect();
    log::warn!(
        "Rejected row at line {}: {:?} ({})",
        rejected.line,
        rejected.record,
        reasons.join("; ")
    );
}

fn feed_error(err: csv::Error) -> PipelineError {
    if matches!(err.kind(), csv::ErrorKind::Io(_)) {
        PipelineError::Csv(err)
    } else {
        PipelineError::malformed(err.to_string())
    }
}
