//! Locus store schema versions.
//!
//! 1 creates `repeats` and `allele_sequences`; 2 adds `ingest_runs` so
//! stores created before run accounting upgrade in place. Pending steps
//! apply in one transaction and bump `user_version` as they go.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "repeats",
        sql: include_str!("0001_repeats.sql"),
    },
    Migration {
        version: 2,
        name: "ingest_runs",
        sql: include_str!("0002_ingest_runs.sql"),
    },
];

/// Schema version a fully upgraded locus store carries.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Upgrades the locus store on `conn` to [`latest_version`].
///
/// # Errors
/// - [`DbError::UnsupportedSchemaVersion`] when the store is newer than this build.
/// - [`DbError::MigrationFailed`] naming the step that failed; nothing is kept.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let current_version: u32 =
        conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let latest = latest_version();

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }
    if current_version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS
        .iter()
        .filter(|migration| migration.version > current_version)
    {
        let step = format!(
            "{}\nPRAGMA user_version = {};",
            migration.sql, migration.version
        );
        tx.execute_batch(&step)
            .map_err(|source| DbError::MigrationFailed {
                version: migration.version,
                name: migration.name,
                source,
            })?;
        info!(
            "event=db_migrate module=db status=ok version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;

    Ok(())
}
