//! Frequency-table ingestion core.
//!
//! # Responsibility
//! - Classify raw input lines.
//! - Resolve coordinates to stored loci.
//! - Decode population allele counts into rounded frequencies.
//!
//! # Invariants
//! - Nothing in this module writes to the store; persistence is driven by
//!   `service::ingest_service`.

pub mod decoder;
pub mod line;
pub mod resolver;
pub mod rounding;
