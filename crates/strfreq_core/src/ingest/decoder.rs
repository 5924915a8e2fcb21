//! Per-population allele-count decoding.
//!
//! # Responsibility
//! - Split one raw population field into `sequence:count` pairs.
//! - Derive each allele's rounded relative frequency.
//! - Quarantine malformed pairs without aborting the field.
//!
//! # Invariants
//! - The total used as denominator equals the sum of well-formed counts.
//! - Records are only built for well-formed pairs, in input order.

use crate::ingest::rounding::relative_frequency;
use crate::model::frequency::FrequencyRecord;
use crate::model::locus::Population;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Raw field value meaning "no data for this population".
pub const NO_DATA_SENTINEL: &str = ".";

const PAIR_DELIMITER: char = ',';
const COUNT_SEPARATOR: char = ':';

/// Why a single allele entry was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MalformedReason {
    /// Entry did not split into exactly `sequence` and `count`.
    FieldCount { parts: usize },
    /// Count is not a non-negative integer, or overflows the field total.
    InvalidCount { value: String },
    EmptySequence,
}

impl Display for MalformedReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FieldCount { parts } => {
                write!(f, "expected `sequence:count`, found {parts} part(s)")
            }
            Self::InvalidCount { value } => write!(f, "invalid allele count `{value}`"),
            Self::EmptySequence => write!(f, "empty allele sequence"),
        }
    }
}

/// One rejected entry inside a population field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MalformedAllele {
    pub population: Population,
    /// Entry text exactly as it appeared between commas.
    pub entry: String,
    pub reason: MalformedReason,
}

/// Decoded output for one population field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeResult {
    pub records: Vec<FrequencyRecord>,
    pub malformed: Vec<MalformedAllele>,
    /// Sum of well-formed counts.
    pub total: u64,
}

impl DecodeResult {
    /// Returns whether the field held no usable data.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Decodes one population's raw allele-count field.
///
/// `sentinel` yields an empty result. Every other value is read as a
/// comma-separated list of `sequence:count` pairs; bad pairs are reported in
/// [`DecodeResult::malformed`] and excluded from the total.
pub fn decode_population(
    population: Population,
    raw: &str,
    sentinel: &str,
    n_effective: Option<f64>,
) -> DecodeResult {
    if raw == sentinel {
        return DecodeResult::default();
    }

    let mut alleles: Vec<(&str, u64)> = Vec::new();
    let mut malformed = Vec::new();
    let mut total = 0u64;
    for entry in raw.split(PAIR_DELIMITER) {
        let parsed = parse_entry(entry).and_then(|(sequence, count)| {
            let sum = total
                .checked_add(count)
                .ok_or_else(|| MalformedReason::InvalidCount {
                    value: count.to_string(),
                })?;
            Ok((sequence, count, sum))
        });
        match parsed {
            Ok((sequence, count, sum)) => {
                total = sum;
                alleles.push((sequence, count));
            }
            Err(reason) => malformed.push(MalformedAllele {
                population,
                entry: entry.to_string(),
                reason,
            }),
        }
    }

    let records = alleles
        .into_iter()
        .map(|(sequence, count)| FrequencyRecord {
            population,
            sequence: sequence.to_string(),
            count,
            frequency: relative_frequency(count, total),
            n_effective,
        })
        .collect();

    DecodeResult {
        records,
        malformed,
        total,
    }
}

fn parse_entry(entry: &str) -> Result<(&str, u64), MalformedReason> {
    let parts: Vec<&str> = entry.split(COUNT_SEPARATOR).collect();
    let [sequence, count] = parts.as_slice() else {
        return Err(MalformedReason::FieldCount { parts: parts.len() });
    };
    if sequence.is_empty() {
        return Err(MalformedReason::EmptySequence);
    }
    let count = count
        .parse::<u64>()
        .map_err(|_| MalformedReason::InvalidCount {
            value: (*count).to_string(),
        })?;
    Ok((*sequence, count))
}
