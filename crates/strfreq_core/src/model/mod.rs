//! Domain model for repeat loci and derived allele frequencies.
//!
//! # Responsibility
//! - Define the locus shape read from the store and the frequency records
//!   appended to it.
//! - Define the closed set of superpopulation codes.
//!
//! # Invariants
//! - Loci are never created by ingestion, only read.
//! - Frequency records are immutable once built.

pub mod frequency;
pub mod locus;
pub mod run;
