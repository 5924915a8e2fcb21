//! Repository layer for the locus store.
//!
//! # Responsibility
//! - Define the lookup/append contract the ingestion core depends on.
//! - Isolate SQLite query details from ingestion orchestration.
//!
//! # Invariants
//! - Writes validate frequency records before persistence.
//! - One `append_frequencies` call is all-or-nothing.

pub mod locus_repo;
pub mod memory_repo;
