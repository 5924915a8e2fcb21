//! Frequency-table ingestion service.
//!
//! # Responsibility
//! - Run resolution and decoding for every data line of every input source.
//! - Persist each resolved line's records in one repository call.
//! - Account for every skipped line and quarantined allele.
//!
//! # Invariants
//! - A line appends all of its records or none of them.
//! - Per-line and per-allele faults never abort a run; only I/O and
//!   repository faults do, after diagnostic streams are flushed.
//! - The first line of every source is a header and is discarded.

use crate::config::IngestConfig;
use crate::diagnostics::{AlleleSkip, DiagnosticLog, LineSkip, SkipReason};
use crate::ingest::decoder::{decode_population, MalformedAllele};
use crate::ingest::line::{parse_line, InputMalformed};
use crate::ingest::resolver::{LocusResolver, Resolution};
use crate::model::locus::{LocusId, Population};
use crate::model::run::RunSummary;
use crate::repo::locus_repo::{LocusRepository, RepoError, RepoResult};
use log::{debug, error, info};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

/// File extension of per-chromosome frequency tables.
pub const INPUT_FILE_EXTENSION: &str = "tab";

pub type IngestResult<T> = Result<T, IngestError>;

/// Fatal ingestion fault. Everything else is recorded in [`IngestReport`].
#[derive(Debug)]
pub enum IngestError {
    /// Input source cannot be opened, listed, or read.
    Io { path: PathBuf, source: io::Error },
    /// A diagnostic stream cannot be written or flushed.
    Diagnostics(io::Error),
    Repo(RepoError),
}

impl Display for IngestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot read `{}`: {source}", path.display()),
            Self::Diagnostics(err) => write!(f, "cannot write diagnostics: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for IngestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Diagnostics(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for IngestError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Classification of one processed data line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// Locus resolved; `appended` records were written.
    Ingested {
        locus: LocusId,
        appended: usize,
        malformed: Vec<MalformedAllele>,
    },
    Skipped(SkipReason),
}

/// Full accounting of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub sources: Vec<String>,
    /// Non-blank data lines seen.
    pub lines_read: u64,
    /// Lines whose locus resolved.
    pub lines_ingested: u64,
    pub records_appended: u64,
    pub input_malformed: u64,
    pub not_found: u64,
    pub ambiguous: u64,
    pub malformed_alleles: u64,
    pub line_skips: Vec<LineSkip>,
    pub allele_skips: Vec<AlleleSkip>,
}

impl IngestReport {
    /// Builds the persisted run summary.
    pub fn summary(&self, run_id: Uuid, source_tag: &str) -> RunSummary {
        RunSummary {
            run_id,
            source_tag: source_tag.to_string(),
            sources: self.sources.clone(),
            lines_read: self.lines_read,
            lines_ingested: self.lines_ingested,
            records_appended: self.records_appended,
            input_malformed: self.input_malformed,
            not_found: self.not_found,
            ambiguous: self.ambiguous,
            malformed_alleles: self.malformed_alleles,
        }
    }

    fn count_skip(&mut self, reason: &SkipReason) {
        match reason {
            SkipReason::InputMalformed { .. } => self.input_malformed += 1,
            SkipReason::NotFound { .. } => self.not_found += 1,
            SkipReason::Ambiguous { .. } => self.ambiguous += 1,
        }
    }
}

/// Use-case service running frequency ingestion against a locus repository.
pub struct IngestService<R: LocusRepository> {
    repo: R,
    config: IngestConfig,
    resolver: LocusResolver,
}

impl<R: LocusRepository> IngestService<R> {
    pub fn new(repo: R, config: IngestConfig) -> Self {
        let resolver = LocusResolver::new(config.source_tag.clone(), config.end_tolerance);
        Self {
            repo,
            config,
            resolver,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn into_repo(self) -> R {
        self.repo
    }

    /// Resolves, decodes and persists one data line.
    ///
    /// # Errors
    /// - Returns repository errors only; malformed input, missing and
    ///   ambiguous loci are reported as [`LineOutcome::Skipped`].
    pub fn process_line(&mut self, line: &str) -> RepoResult<LineOutcome> {
        let parsed = match parse_line(line) {
            Ok(parsed) => parsed,
            Err(detail) => {
                return Ok(LineOutcome::Skipped(SkipReason::InputMalformed { detail }));
            }
        };

        let locus = match self
            .resolver
            .resolve(&self.repo, parsed.chromosome, parsed.start, parsed.end)?
        {
            Resolution::Resolved(locus) => locus,
            Resolution::NotFound => {
                return Ok(LineOutcome::Skipped(SkipReason::NotFound {
                    chromosome: parsed.chromosome.to_string(),
                    start: parsed.start,
                    end: parsed.end,
                }));
            }
            Resolution::Ambiguous { candidates } => {
                return Ok(LineOutcome::Skipped(SkipReason::Ambiguous {
                    chromosome: parsed.chromosome.to_string(),
                    start: parsed.start,
                    end: parsed.end,
                    candidates,
                }));
            }
        };

        let mut records = Vec::new();
        let mut malformed = Vec::new();
        for population in Population::ALL {
            let decoded = decode_population(
                population,
                parsed.raw_field(population),
                &self.config.sentinel,
                locus.n_effective,
            );
            records.extend(decoded.records);
            malformed.extend(decoded.malformed);
        }

        let appended = if records.is_empty() {
            0
        } else {
            self.repo
                .append_frequencies(locus.id, &records, self.config.duplicate_policy)?
        };
        debug!(
            "event=line_ingest module=ingest status=ok locus={} region={} appended={} malformed={}",
            locus.id,
            locus.region(),
            appended,
            malformed.len()
        );

        Ok(LineOutcome::Ingested {
            locus: locus.id,
            appended,
            malformed,
        })
    }

    /// Ingests every data line of one source into `report`.
    ///
    /// `source` names the input in diagnostics.
    pub fn ingest_reader<B: BufRead>(
        &mut self,
        source: &str,
        mut reader: B,
        diagnostics: &mut DiagnosticLog,
        report: &mut IngestReport,
    ) -> IngestResult<()> {
        let started_at = Instant::now();
        let lines_before = report.lines_read;
        info!("event=source_ingest module=ingest status=start source={source}");
        report.sources.push(source.to_string());

        let mut buf = Vec::new();
        // Line 0 is the header, so the physical index is the data line number.
        let mut index = 0u64;
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|err| IngestError::Io {
                    path: PathBuf::from(source),
                    source: err,
                })?;
            if read == 0 {
                break;
            }
            let line_number = index;
            index += 1;
            if line_number == 0 {
                continue;
            }
            strip_line_ending(&mut buf);

            let (line, outcome) = match std::str::from_utf8(&buf) {
                Ok(text) if text.trim().is_empty() => continue,
                Ok(text) => (text.to_string(), self.process_line(text)?),
                Err(err) => (
                    String::from_utf8_lossy(&buf).into_owned(),
                    LineOutcome::Skipped(SkipReason::InputMalformed {
                        detail: InputMalformed::InvalidEncoding {
                            valid_up_to: err.valid_up_to(),
                        },
                    }),
                ),
            };
            report.lines_read += 1;

            match outcome {
                LineOutcome::Ingested {
                    appended,
                    malformed,
                    ..
                } => {
                    report.lines_ingested += 1;
                    report.records_appended += appended as u64;
                    for allele in malformed {
                        let skip = AlleleSkip {
                            source: source.to_string(),
                            line_number,
                            line: line.clone(),
                            allele,
                        };
                        diagnostics
                            .record_allele_skip(&skip)
                            .map_err(IngestError::Diagnostics)?;
                        report.malformed_alleles += 1;
                        report.allele_skips.push(skip);
                    }
                }
                LineOutcome::Skipped(reason) => {
                    report.count_skip(&reason);
                    let skip = LineSkip {
                        source: source.to_string(),
                        line_number,
                        line,
                        reason,
                    };
                    diagnostics
                        .record_line_skip(&skip)
                        .map_err(IngestError::Diagnostics)?;
                    report.line_skips.push(skip);
                }
            }
        }

        info!(
            "event=source_ingest module=ingest status=ok source={} lines={} duration_ms={}",
            source,
            report.lines_read - lines_before,
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// Opens and ingests one frequency-table file.
    pub fn ingest_file(
        &mut self,
        path: &Path,
        diagnostics: &mut DiagnosticLog,
        report: &mut IngestReport,
    ) -> IngestResult<()> {
        let file = File::open(path).map_err(|err| IngestError::Io {
            path: path.to_path_buf(),
            source: err,
        })?;
        let source = path.display().to_string();
        self.ingest_reader(&source, BufReader::new(file), diagnostics, report)
    }

    /// Ingests `paths` in order and returns the run report.
    ///
    /// Diagnostic streams are flushed before returning, including when a
    /// fatal fault aborts the run.
    pub fn ingest_paths(
        &mut self,
        paths: &[PathBuf],
        diagnostics: &mut DiagnosticLog,
    ) -> IngestResult<IngestReport> {
        let mut report = IngestReport::default();
        let outcome = paths
            .iter()
            .try_for_each(|path| self.ingest_file(path, diagnostics, &mut report));

        let flushed = diagnostics.flush().map_err(IngestError::Diagnostics);
        if let Err(err) = outcome {
            error!(
                "event=ingest_run module=ingest status=error lines={} error={}",
                report.lines_read, err
            );
            if let Err(flush_err) = flushed {
                error!("event=diagnostics_flush module=ingest status=error error={flush_err}");
            }
            return Err(err);
        }
        flushed?;
        Ok(report)
    }

    /// Records the run summary under a fresh run id.
    pub fn finish_run(&mut self, report: &IngestReport) -> IngestResult<RunSummary> {
        let summary = report.summary(Uuid::new_v4(), &self.config.source_tag);
        self.repo.record_run(&summary)?;
        info!(
            "event=ingest_run module=ingest status=ok run_id={} lines={} ingested={} records={} skipped={} malformed_alleles={}",
            summary.run_id,
            summary.lines_read,
            summary.lines_ingested,
            summary.records_appended,
            summary.lines_skipped(),
            summary.malformed_alleles
        );
        Ok(summary)
    }
}

fn strip_line_ending(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
}

/// Lists `.tab` frequency tables directly inside `dir`, sorted by name.
pub fn collect_input_files(dir: &Path) -> IngestResult<Vec<PathBuf>> {
    let io_error = |err: io::Error| IngestError::Io {
        path: dir.to_path_buf(),
        source: err,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        let is_table = path
            .extension()
            .is_some_and(|extension| extension.to_str() == Some(INPUT_FILE_EXTENSION));
        if is_table && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
