//! SQLite locus store: connection bootstrap and schema upgrades.
//!
//! Loci live in `repeats`, their per-population alleles in
//! `allele_sequences`, and completed runs in `ingest_runs`. The schema
//! version is `PRAGMA user_version`.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Store was written by a newer release.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// A schema step failed; the whole upgrade was rolled back.
    MigrationFailed {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "locus store schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::MigrationFailed {
                version,
                name,
                source,
            } => write!(f, "locus store migration {version} ({name}) failed: {source}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::MigrationFailed { source: err, .. } => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
