//! Allele frequency record model.
//!
//! # Responsibility
//! - Define one allele's observed count and derived frequency within one
//!   population at one locus.
//! - Validate record shape before it reaches storage.
//!
//! # Invariants
//! - `frequency` lies in `[0, 1]`.
//! - `sequence` is never empty.

use crate::model::locus::Population;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One allele's frequency within one population at one locus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyRecord {
    pub population: Population,
    /// Repeat-motif allele sequence.
    pub sequence: String,
    /// Number of observed calls of this allele.
    pub count: u64,
    /// `count / population total`, rounded to two significant figures.
    pub frequency: f64,
    /// Effective sample size of the parent locus at creation time.
    pub n_effective: Option<f64>,
}

/// Validation failures for frequency records.
#[derive(Debug, Clone, PartialEq)]
pub enum FrequencyValidationError {
    EmptySequence,
    FrequencyOutOfRange(f64),
}

impl Display for FrequencyValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySequence => write!(f, "allele sequence cannot be empty"),
            Self::FrequencyOutOfRange(value) => {
                write!(f, "frequency {value} is outside [0, 1]")
            }
        }
    }
}

impl Error for FrequencyValidationError {}

impl FrequencyRecord {
    /// Checks record invariants.
    pub fn validate(&self) -> Result<(), FrequencyValidationError> {
        if self.sequence.is_empty() {
            return Err(FrequencyValidationError::EmptySequence);
        }
        if !(0.0..=1.0).contains(&self.frequency) {
            return Err(FrequencyValidationError::FrequencyOutOfRange(
                self.frequency,
            ));
        }
        Ok(())
    }

    /// Key used by the replace policy to detect an existing record.
    pub fn identity(&self) -> (Population, &str) {
        (self.population, self.sequence.as_str())
    }
}
