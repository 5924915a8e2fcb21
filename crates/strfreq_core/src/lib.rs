//! Population STR allele-frequency ingestion.
//!
//! Resolves frequency-table lines to stored repeat loci and appends rounded
//! per-population allele frequencies to them.

pub mod config;
pub mod db;
pub mod diagnostics;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::IngestConfig;
pub use diagnostics::{AlleleSkip, DiagnosticLog, LineSkip, SkipReason};
pub use ingest::decoder::{decode_population, DecodeResult, MalformedAllele, MalformedReason};
pub use ingest::line::{parse_line, InputLine, InputMalformed};
pub use ingest::resolver::{LocusResolver, Resolution};
pub use ingest::rounding::{round_sig_figs, FREQUENCY_SIG_FIGS};
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status, LogTarget};
pub use model::frequency::FrequencyRecord;
pub use model::locus::{Locus, LocusId, Population};
pub use model::run::{RunId, RunSummary};
pub use repo::locus_repo::{
    DuplicatePolicy, LocusRepository, RepoError, RepoResult, SqliteLocusRepository,
};
pub use repo::memory_repo::MemoryLocusRepository;
pub use service::ingest_service::{
    collect_input_files, IngestError, IngestReport, IngestResult, IngestService, LineOutcome,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
