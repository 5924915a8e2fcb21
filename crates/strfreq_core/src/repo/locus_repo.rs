//! Locus repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Look up candidate loci by source, chromosome, start and an end range.
//! - Append derived frequency records to a locus atomically.
//! - Persist per-run accounting.
//!
//! # Invariants
//! - `append_frequencies` writes every record of the batch or none of them.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::frequency::{FrequencyRecord, FrequencyValidationError};
use crate::model::locus::{Locus, LocusId, Population};
use crate::model::run::RunSummary;
use rusqlite::{params, Connection, Row, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::RangeInclusive;

const LOCUS_SELECT_SQL: &str = "SELECT
    id,
    chr,
    start_pos,
    end_pos,
    source,
    n_effective
FROM repeats";

const REQUIRED_TABLES: [&str; 3] = ["repeats", "allele_sequences", "ingest_runs"];

const SOURCES_DELIMITER: &str = "\n";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for locus lookup and frequency persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(FrequencyValidationError),
    Db(DbError),
    LocusNotFound(LocusId),
    MissingRequiredTable(&'static str),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::LocusNotFound(id) => write!(f, "locus not found: {id}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "locus store is missing required table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted locus data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::LocusNotFound(_) | Self::MissingRequiredTable(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<FrequencyValidationError> for RepoError {
    fn from(value: FrequencyValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// How appended records treat an existing record with the same
/// `(locus, population, sequence)` key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Always insert; re-ingesting the same input duplicates records.
    #[default]
    Append,
    /// Remove records sharing the key before inserting.
    Replace,
}

/// Store operations the ingestion core depends on.
pub trait LocusRepository {
    /// Returns loci with matching source, chromosome and start whose end
    /// lies inside `end_range`.
    fn find_loci(
        &self,
        source: &str,
        chromosome: &str,
        start: i64,
        end_range: RangeInclusive<i64>,
    ) -> RepoResult<Vec<Locus>>;

    /// Appends a batch of records to one locus, all or nothing.
    ///
    /// Returns the number of records written.
    fn append_frequencies(
        &mut self,
        locus: LocusId,
        records: &[FrequencyRecord],
        policy: DuplicatePolicy,
    ) -> RepoResult<usize>;

    /// Returns records attached to `locus` in insertion order.
    fn frequencies_for_locus(&self, locus: LocusId) -> RepoResult<Vec<FrequencyRecord>>;

    /// Persists one run's accounting.
    fn record_run(&mut self, summary: &RunSummary) -> RepoResult<()>;

    /// Appends a single record to one locus.
    fn append_frequency(&mut self, locus: LocusId, record: &FrequencyRecord) -> RepoResult<()> {
        self.append_frequencies(locus, std::slice::from_ref(record), DuplicatePolicy::Append)?;
        Ok(())
    }
}

/// SQLite-backed locus repository.
pub struct SqliteLocusRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteLocusRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - Returns `MissingRequiredTable` when the schema is incomplete.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        for table in REQUIRED_TABLES {
            if !table_exists(conn, table)? {
                return Err(RepoError::MissingRequiredTable(table));
            }
        }
        Ok(Self { conn })
    }

    /// Inserts one locus row. Loci are normally loaded by panel import, not
    /// by frequency ingestion; this is the seeding entry point.
    pub fn insert_locus(
        &self,
        chromosome: &str,
        start: i64,
        end: i64,
        source: &str,
        n_effective: Option<f64>,
    ) -> RepoResult<Locus> {
        self.conn.execute(
            "INSERT INTO repeats (chr, start_pos, end_pos, source, n_effective)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![chromosome, start, end, source, n_effective],
        )?;

        Ok(Locus {
            id: self.conn.last_insert_rowid(),
            chromosome: chromosome.to_string(),
            start,
            end,
            source: source.to_string(),
            n_effective,
        })
    }

    /// Loads a previously recorded run.
    pub fn load_run(&self, run_id: uuid::Uuid) -> RepoResult<Option<RunSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                uuid,
                source_tag,
                sources,
                lines_read,
                lines_ingested,
                records_appended,
                input_malformed,
                not_found,
                ambiguous,
                malformed_alleles
             FROM ingest_runs
             WHERE uuid = ?1;",
        )?;
        let mut rows = stmt.query([run_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_run_row(row)?));
        }
        Ok(None)
    }
}

impl LocusRepository for SqliteLocusRepository<'_> {
    fn find_loci(
        &self,
        source: &str,
        chromosome: &str,
        start: i64,
        end_range: RangeInclusive<i64>,
    ) -> RepoResult<Vec<Locus>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "{LOCUS_SELECT_SQL}
             WHERE source = ?1
               AND chr = ?2
               AND start_pos = ?3
               AND end_pos BETWEEN ?4 AND ?5
             ORDER BY id ASC;"
        ))?;

        let mut rows = stmt.query(params![
            source,
            chromosome,
            start,
            *end_range.start(),
            *end_range.end()
        ])?;
        let mut loci = Vec::new();
        while let Some(row) = rows.next()? {
            loci.push(parse_locus_row(row)?);
        }
        Ok(loci)
    }

    fn append_frequencies(
        &mut self,
        locus: LocusId,
        records: &[FrequencyRecord],
        policy: DuplicatePolicy,
    ) -> RepoResult<usize> {
        for record in records {
            record.validate()?;
        }

        let tx = self.conn.transaction()?;
        if !locus_exists_in_tx(&tx, locus)? {
            return Err(RepoError::LocusNotFound(locus));
        }

        if policy == DuplicatePolicy::Replace {
            // Keys repeated inside the batch are cleared once, before any insert.
            let keys: BTreeSet<(&str, &str)> = records
                .iter()
                .map(|record| (record.population.code(), record.sequence.as_str()))
                .collect();
            for (population, sequence) in keys {
                tx.execute(
                    "DELETE FROM allele_sequences
                     WHERE repeat_id = ?1
                       AND population = ?2
                       AND sequence = ?3;",
                    params![locus, population, sequence],
                )?;
            }
        }

        for record in records {
            tx.execute(
                "INSERT INTO allele_sequences (
                    repeat_id,
                    population,
                    sequence,
                    num_called,
                    frequency,
                    n_effective
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    locus,
                    record.population.code(),
                    record.sequence.as_str(),
                    count_to_db(record.count, "allele_sequences.num_called")?,
                    record.frequency,
                    record.n_effective,
                ],
            )?;
        }

        tx.commit()?;
        Ok(records.len())
    }

    fn frequencies_for_locus(&self, locus: LocusId) -> RepoResult<Vec<FrequencyRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                population,
                sequence,
                num_called,
                frequency,
                n_effective
             FROM allele_sequences
             WHERE repeat_id = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([locus])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_frequency_row(row)?);
        }
        Ok(records)
    }

    fn record_run(&mut self, summary: &RunSummary) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO ingest_runs (
                uuid,
                source_tag,
                sources,
                lines_read,
                lines_ingested,
                records_appended,
                input_malformed,
                not_found,
                ambiguous,
                malformed_alleles
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                summary.run_id.to_string(),
                summary.source_tag.as_str(),
                summary.sources.join(SOURCES_DELIMITER),
                count_to_db(summary.lines_read, "ingest_runs.lines_read")?,
                count_to_db(summary.lines_ingested, "ingest_runs.lines_ingested")?,
                count_to_db(summary.records_appended, "ingest_runs.records_appended")?,
                count_to_db(summary.input_malformed, "ingest_runs.input_malformed")?,
                count_to_db(summary.not_found, "ingest_runs.not_found")?,
                count_to_db(summary.ambiguous, "ingest_runs.ambiguous")?,
                count_to_db(summary.malformed_alleles, "ingest_runs.malformed_alleles")?,
            ],
        )?;
        Ok(())
    }
}

fn parse_locus_row(row: &Row<'_>) -> RepoResult<Locus> {
    Ok(Locus {
        id: row.get("id")?,
        chromosome: row.get("chr")?,
        start: row.get("start_pos")?,
        end: row.get("end_pos")?,
        source: row.get("source")?,
        n_effective: row.get("n_effective")?,
    })
}

fn parse_frequency_row(row: &Row<'_>) -> RepoResult<FrequencyRecord> {
    let population_text: String = row.get("population")?;
    let population = Population::from_code(&population_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid population `{population_text}` in allele_sequences.population"
        ))
    })?;

    let record = FrequencyRecord {
        population,
        sequence: row.get("sequence")?,
        count: count_from_db(row.get("num_called")?, "allele_sequences.num_called")?,
        frequency: row.get("frequency")?,
        n_effective: row.get("n_effective")?,
    };
    record.validate()?;
    Ok(record)
}

fn parse_run_row(row: &Row<'_>) -> RepoResult<RunSummary> {
    let uuid_text: String = row.get("uuid")?;
    let run_id = uuid::Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in ingest_runs.uuid"))
    })?;
    let sources_text: String = row.get("sources")?;
    let sources = if sources_text.is_empty() {
        Vec::new()
    } else {
        sources_text
            .split(SOURCES_DELIMITER)
            .map(str::to_string)
            .collect()
    };

    Ok(RunSummary {
        run_id,
        source_tag: row.get("source_tag")?,
        sources,
        lines_read: count_from_db(row.get("lines_read")?, "ingest_runs.lines_read")?,
        lines_ingested: count_from_db(row.get("lines_ingested")?, "ingest_runs.lines_ingested")?,
        records_appended: count_from_db(
            row.get("records_appended")?,
            "ingest_runs.records_appended",
        )?,
        input_malformed: count_from_db(
            row.get("input_malformed")?,
            "ingest_runs.input_malformed",
        )?,
        not_found: count_from_db(row.get("not_found")?, "ingest_runs.not_found")?,
        ambiguous: count_from_db(row.get("ambiguous")?, "ingest_runs.ambiguous")?,
        malformed_alleles: count_from_db(
            row.get("malformed_alleles")?,
            "ingest_runs.malformed_alleles",
        )?,
    })
}

fn count_to_db(value: u64, column: &str) -> RepoResult<i64> {
    i64::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("count {value} overflows {column}")))
}

fn count_from_db(value: i64, column: &str) -> RepoResult<u64> {
    u64::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("negative count {value} in {column}")))
}

fn locus_exists_in_tx(tx: &Transaction<'_>, locus: LocusId) -> RepoResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM repeats WHERE id = ?1);",
        [locus],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
