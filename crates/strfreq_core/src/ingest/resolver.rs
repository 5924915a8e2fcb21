//! Coordinate-to-locus resolution.
//!
//! # Responsibility
//! - Map a `(chromosome, start, end)` triple to exactly one stored locus.
//! - Distinguish "no match" from "more than one match".
//!
//! # Invariants
//! - Match predicate: same source tag, same chromosome, same start, and
//!   stored end within `end ± tolerance`.
//! - Repositories may over-approximate candidates; the predicate here is
//!   authoritative.

use crate::model::locus::{Locus, LocusId};
use crate::repo::locus_repo::{LocusRepository, RepoResult};
use std::ops::RangeInclusive;

/// Result of resolving one coordinate triple.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(Locus),
    NotFound,
    /// More than one locus matched; ids are listed for diagnostics.
    Ambiguous { candidates: Vec<LocusId> },
}

/// Resolves input coordinates against loci of one ingestion source.
#[derive(Debug, Clone)]
pub struct LocusResolver {
    source_tag: String,
    end_tolerance: i64,
}

impl LocusResolver {
    pub fn new(source_tag: impl Into<String>, end_tolerance: u32) -> Self {
        Self {
            source_tag: source_tag.into(),
            end_tolerance: i64::from(end_tolerance),
        }
    }

    pub fn source_tag(&self) -> &str {
        self.source_tag.as_str()
    }

    /// Inclusive window of stored end coordinates accepted for input `end`.
    pub fn end_window(&self, end: i64) -> RangeInclusive<i64> {
        let low = end.saturating_sub(self.end_tolerance).max(0);
        let high = end.saturating_add(self.end_tolerance);
        low..=high
    }

    /// Returns whether `locus` satisfies the match predicate.
    pub fn matches(&self, locus: &Locus, chromosome: &str, start: i64, end: i64) -> bool {
        locus.source == self.source_tag
            && locus.chromosome == chromosome
            && locus.start == start
            && self.end_window(end).contains(&locus.end)
    }

    /// Looks up the unique locus for the given coordinates.
    ///
    /// # Errors
    /// - Returns repository errors unchanged; zero or many matches are
    ///   reported through [`Resolution`], not as errors.
    pub fn resolve<R: LocusRepository + ?Sized>(
        &self,
        repo: &R,
        chromosome: &str,
        start: i64,
        end: i64,
    ) -> RepoResult<Resolution> {
        let mut candidates =
            repo.find_loci(&self.source_tag, chromosome, start, self.end_window(end))?;
        candidates.retain(|locus| self.matches(locus, chromosome, start, end));

        if candidates.len() > 1 {
            return Ok(Resolution::Ambiguous {
                candidates: candidates.iter().map(|locus| locus.id).collect(),
            });
        }
        Ok(candidates
            .pop()
            .map_or(Resolution::NotFound, Resolution::Resolved))
    }
}
