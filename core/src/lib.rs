//! Sales batch pipeline: feed ingestion and validation, aggregation by
//! agent, retailer and month, threshold commissions, and SQLite
//! persistence of the normalized entities.

pub mod aggregation;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod pipeline;
pub mod record;
pub mod store;
pub mod types;
