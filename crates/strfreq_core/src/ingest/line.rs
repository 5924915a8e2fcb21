//! Input line classification.
//!
//! # Responsibility
//! - Split a whitespace-delimited frequency-table line into coordinates and
//!   per-population raw fields.
//! - Classify unusable lines as [`InputMalformed`] before any store lookup.
//!
//! # Invariants
//! - A parsed line always carries all five population fields.
//! - Coordinates are non-negative.

use crate::model::locus::Population;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Chromosome, start and end precede the population fields.
pub const COORDINATE_COLUMNS: usize = 3;
/// Minimum number of columns a data line must carry.
pub const REQUIRED_COLUMNS: usize = COORDINATE_COLUMNS + Population::ALL.len();

static CHROMOSOME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^chr[0-9A-Za-z_]+$").expect("valid chromosome regex"));

/// Reason a line could not be classified into coordinates and fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputMalformed {
    MissingColumns { found: usize, expected: usize },
    InvalidInteger { column: String, value: String },
    InvalidChromosome { value: String },
    /// Line bytes are not UTF-8; `valid_up_to` is the offset of the first bad byte.
    InvalidEncoding { valid_up_to: usize },
}

impl Display for InputMalformed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingColumns { found, expected } => {
                write!(f, "expected {expected} columns, found {found}")
            }
            Self::InvalidInteger { column, value } => {
                write!(f, "invalid value for {column} column: `{value}`")
            }
            Self::InvalidChromosome { value } => write!(f, "invalid chromosome `{value}`"),
            Self::InvalidEncoding { valid_up_to } => {
                write!(f, "invalid UTF-8 after byte {valid_up_to}")
            }
        }
    }
}

/// One classified data line, borrowing from the raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputLine<'a> {
    pub chromosome: &'a str,
    pub start: i64,
    pub end: i64,
    fields: [&'a str; 5],
}

impl<'a> InputLine<'a> {
    /// Raw allele-count field for `population`.
    pub fn raw_field(&self, population: Population) -> &'a str {
        self.fields[population.column_index() - COORDINATE_COLUMNS]
    }

    /// Formats `chr:start-end` for diagnostics.
    pub fn region(&self) -> String {
        format!("{}:{}-{}", self.chromosome, self.start, self.end)
    }
}

/// Classifies one data line.
///
/// Extra columns past the last population are ignored.
pub fn parse_line(line: &str) -> Result<InputLine<'_>, InputMalformed> {
    let columns: Vec<&str> = line.split_whitespace().collect();
    if columns.len() < REQUIRED_COLUMNS {
        return Err(InputMalformed::MissingColumns {
            found: columns.len(),
            expected: REQUIRED_COLUMNS,
        });
    }

    let start = parse_coordinate("start", columns[1])?;
    let end = parse_coordinate("end", columns[2])?;

    let chromosome = columns[0];
    if !CHROMOSOME_RE.is_match(chromosome) {
        return Err(InputMalformed::InvalidChromosome {
            value: chromosome.to_string(),
        });
    }

    let mut fields = [""; 5];
    for population in Population::ALL {
        fields[population.column_index() - COORDINATE_COLUMNS] = columns[population.column_index()];
    }

    Ok(InputLine {
        chromosome,
        start,
        end,
        fields,
    })
}

fn parse_coordinate(column: &str, value: &str) -> Result<i64, InputMalformed> {
    match value.parse::<i64>() {
        Ok(parsed) if parsed >= 0 => Ok(parsed),
        _ => Err(InputMalformed::InvalidInteger {
            column: column.to_string(),
            value: value.to_string(),
        }),
    }
}
