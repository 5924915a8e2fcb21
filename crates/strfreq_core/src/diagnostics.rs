//! Skip accounting for ingestion runs.
//!
//! # Responsibility
//! - Describe every skipped line and every quarantined allele entry.
//! - Write them to two line-oriented diagnostic streams (resolution
//!   failures, malformed alleles) and mirror them to the application log.
//!
//! # Invariants
//! - One stream line per event; raw input text is written without its
//!   trailing newline.
//! - Streams are flushed by `DiagnosticLog::flush`, which ingestion calls on
//!   both success and fatal error.

use crate::ingest::decoder::MalformedAllele;
use crate::ingest::line::InputMalformed;
use crate::model::locus::LocusId;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Why a whole line contributed no data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    InputMalformed {
        detail: InputMalformed,
    },
    NotFound {
        chromosome: String,
        start: i64,
        end: i64,
    },
    Ambiguous {
        chromosome: String,
        start: i64,
        end: i64,
        candidates: Vec<LocusId>,
    },
}

impl SkipReason {
    /// Stable reason code for logs and counters.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InputMalformed { .. } => "input_malformed",
            Self::NotFound { .. } => "not_found",
            Self::Ambiguous { .. } => "ambiguous",
        }
    }
}

/// One skipped input line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSkip {
    /// Input source name, usually the file path.
    pub source: String,
    /// 1-based data line number (header excluded).
    pub line_number: u64,
    pub line: String,
    pub reason: SkipReason,
}

impl Display for LineSkip {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: ", self.source)?;
        match &self.reason {
            SkipReason::InputMalformed { detail } => match detail {
                InputMalformed::MissingColumns { .. } => write!(
                    f,
                    "Not enough columns in line {}: {}",
                    self.line_number, self.line
                ),
                InputMalformed::InvalidInteger { column, value } => write!(
                    f,
                    "Invalid value for {column} column: `{value}` with line contents: {}",
                    self.line
                ),
                InputMalformed::InvalidChromosome { value } => write!(
                    f,
                    "Invalid chromosome `{value}` in line {}: {}",
                    self.line_number, self.line
                ),
                InputMalformed::InvalidEncoding { valid_up_to } => write!(
                    f,
                    "Invalid UTF-8 after byte {valid_up_to} in line {}: {}",
                    self.line_number, self.line
                ),
            },
            SkipReason::NotFound {
                chromosome,
                start,
                end,
            } => write!(f, "No matching record found for chr: {chromosome}:{start}-{end}"),
            SkipReason::Ambiguous {
                chromosome,
                start,
                end,
                candidates,
            } => {
                let ids: Vec<String> = candidates.iter().map(ToString::to_string).collect();
                write!(
                    f,
                    "Multiple results found for chr: {chromosome}:{start}-{end} (loci {})",
                    ids.join(",")
                )
            }
        }
    }
}

/// One quarantined allele entry on an otherwise resolved line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlleleSkip {
    pub source: String,
    pub line_number: u64,
    pub line: String,
    pub allele: MalformedAllele,
}

impl Display for AlleleSkip {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: Skipped or malformed allele entry at line {}: {} ({} `{}`: {})",
            self.source,
            self.line_number,
            self.line,
            self.allele.population,
            self.allele.entry,
            self.allele.reason
        )
    }
}

/// Pair of diagnostic output streams.
pub struct DiagnosticLog {
    resolution: Box<dyn Write>,
    alleles: Box<dyn Write>,
}

impl DiagnosticLog {
    pub fn new(resolution: impl Write + 'static, alleles: impl Write + 'static) -> Self {
        Self {
            resolution: Box::new(resolution),
            alleles: Box::new(alleles),
        }
    }

    /// Creates (truncating) both diagnostic files.
    pub fn create(error_log: &Path, skipped_alleles_log: &Path) -> io::Result<Self> {
        let resolution = BufWriter::new(File::create(error_log)?);
        let alleles = BufWriter::new(File::create(skipped_alleles_log)?);
        Ok(Self::new(resolution, alleles))
    }

    /// Discards stream output; events still reach the application log.
    pub fn discard() -> Self {
        Self::new(io::sink(), io::sink())
    }

    pub fn record_line_skip(&mut self, skip: &LineSkip) -> io::Result<()> {
        warn!(
            "event=line_skip module=ingest status=skip reason={} source={} line={}",
            skip.reason.code(),
            skip.source,
            skip.line_number
        );
        writeln!(self.resolution, "{skip}")
    }

    pub fn record_allele_skip(&mut self, skip: &AlleleSkip) -> io::Result<()> {
        warn!(
            "event=allele_skip module=ingest status=skip population={} source={} line={}",
            skip.allele.population, skip.source, skip.line_number
        );
        writeln!(self.alleles, "{skip}")
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.resolution.flush()?;
        self.alleles.flush()
    }
}
