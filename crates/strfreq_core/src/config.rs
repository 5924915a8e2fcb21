//! Ingestion configuration.
//!
//! # Invariants
//! - `Default` reproduces the historical EnsembleTR ingestion behavior:
//!   source tag `EnsembleTR`, end tolerance 2, sentinel `.`, append-only.

use crate::ingest::decoder::NO_DATA_SENTINEL;
use crate::repo::locus_repo::DuplicatePolicy;
use serde::{Deserialize, Serialize};

/// Source tag of the loci frequency tables are matched against.
pub const DEFAULT_SOURCE_TAG: &str = "EnsembleTR";
/// Accepted distance between input and stored end coordinates.
pub const DEFAULT_END_TOLERANCE: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub source_tag: String,
    pub end_tolerance: u32,
    /// Raw population field meaning "no data".
    pub sentinel: String,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            source_tag: DEFAULT_SOURCE_TAG.to_string(),
            end_tolerance: DEFAULT_END_TOLERANCE,
            sentinel: NO_DATA_SENTINEL.to_string(),
            duplicate_policy: DuplicatePolicy::Append,
        }
    }
}
