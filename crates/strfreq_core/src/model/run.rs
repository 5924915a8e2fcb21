//! Ingestion run accounting.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one ingestion run.
pub type RunId = Uuid;

/// Per-run totals persisted alongside the frequencies a run appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub source_tag: String,
    /// Input sources in processing order.
    pub sources: Vec<String>,
    pub lines_read: u64,
    pub lines_ingested: u64,
    pub records_appended: u64,
    pub input_malformed: u64,
    pub not_found: u64,
    pub ambiguous: u64,
    pub malformed_alleles: u64,
}

impl RunSummary {
    /// Lines that contributed no data.
    pub fn lines_skipped(&self) -> u64 {
        self.input_malformed + self.not_found + self.ambiguous
    }
}
