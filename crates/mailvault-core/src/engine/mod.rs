//! The ingestion orchestrator.

mod run;
mod stats;

pub use run::{IngestionEngine, IngestionRequest};
pub use stats::IngestionStats;
