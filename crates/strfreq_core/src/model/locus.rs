//! Locus domain model.
//!
//! # Responsibility
//! - Describe one stored tandem-repeat region as seen by the resolver.
//! - Define superpopulation codes and their input column layout.
//!
//! # Invariants
//! - `start <= end` for every persisted locus.
//! - `Population::ALL` order matches input column order.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Row id of a locus in the relational store.
pub type LocusId = i64;

/// Superpopulation label under which allele counts are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Population {
    /// African.
    Afr,
    /// Admixed American.
    Amr,
    /// East Asian.
    Eas,
    /// European.
    Eur,
    /// South Asian.
    Sas,
}

impl Population {
    /// All populations in input column order.
    pub const ALL: [Population; 5] = [
        Population::Afr,
        Population::Amr,
        Population::Eas,
        Population::Eur,
        Population::Sas,
    ];

    /// Zero-based column index of this population's raw field in an input line.
    pub fn column_index(self) -> usize {
        match self {
            Self::Afr => 3,
            Self::Amr => 4,
            Self::Eas => 5,
            Self::Eur => 6,
            Self::Sas => 7,
        }
    }

    /// Stable uppercase code used in storage and logs.
    pub fn code(self) -> &'static str {
        match self {
            Self::Afr => "AFR",
            Self::Amr => "AMR",
            Self::Eas => "EAS",
            Self::Eur => "EUR",
            Self::Sas => "SAS",
        }
    }

    /// Parses an uppercase population code.
    pub fn from_code(value: &str) -> Option<Self> {
        match value {
            "AFR" => Some(Self::Afr),
            "AMR" => Some(Self::Amr),
            "EAS" => Some(Self::Eas),
            "EUR" => Some(Self::Eur),
            "SAS" => Some(Self::Sas),
            _ => None,
        }
    }
}

impl Display for Population {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Stored tandem-repeat region that input lines are matched against.
///
/// Attached frequency records live in the store and are read back through
/// `LocusRepository::frequencies_for_locus`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Locus {
    /// Store row id.
    pub id: LocusId,
    /// Chromosome name, e.g. `chr10`.
    pub chromosome: String,
    /// 0-based start coordinate.
    pub start: i64,
    pub end: i64,
    /// Ingestion-source label, e.g. `EnsembleTR`.
    pub source: String,
    /// Effective sample size; copied onto every derived frequency record.
    pub n_effective: Option<f64>,
}

impl Locus {
    /// Formats `chr:start-end` for diagnostics.
    pub fn region(&self) -> String {
        format!("{}:{}-{}", self.chromosome, self.start, self.end)
    }
}
