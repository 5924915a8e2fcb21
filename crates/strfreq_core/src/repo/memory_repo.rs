//! In-memory locus repository.
//!
//! Backs dry runs and tests that exercise resolution and decoding without a
//! database file. Same batch semantics as the SQLite implementation.

use crate::model::frequency::FrequencyRecord;
use crate::model::locus::{Locus, LocusId};
use crate::model::run::RunSummary;
use crate::repo::locus_repo::{DuplicatePolicy, LocusRepository, RepoError, RepoResult};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

#[derive(Debug, Default)]
pub struct MemoryLocusRepository {
    loci: Vec<Locus>,
    frequencies: BTreeMap<LocusId, Vec<FrequencyRecord>>,
    runs: Vec<RunSummary>,
}

impl MemoryLocusRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a locus with the next sequential id.
    pub fn insert_locus(
        &mut self,
        chromosome: &str,
        start: i64,
        end: i64,
        source: &str,
        n_effective: Option<f64>,
    ) -> Locus {
        let locus = Locus {
            id: self.loci.last().map_or(1, |last| last.id + 1),
            chromosome: chromosome.to_string(),
            start,
            end,
            source: source.to_string(),
            n_effective,
        };
        self.loci.push(locus.clone());
        locus
    }

    pub fn runs(&self) -> &[RunSummary] {
        &self.runs
    }

    /// Total records across all loci.
    pub fn frequency_count(&self) -> usize {
        self.frequencies.values().map(Vec::len).sum()
    }
}

impl LocusRepository for MemoryLocusRepository {
    fn find_loci(
        &self,
        source: &str,
        chromosome: &str,
        start: i64,
        end_range: RangeInclusive<i64>,
    ) -> RepoResult<Vec<Locus>> {
        Ok(self
            .loci
            .iter()
            .filter(|locus| {
                locus.source == source
                    && locus.chromosome == chromosome
                    && locus.start == start
                    && end_range.contains(&locus.end)
            })
            .cloned()
            .collect())
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
        if !self.loci.iter().any(|known| known.id == locus) {
            return Err(RepoError::LocusNotFound(locus));
        }

        let attached = self.frequencies.entry(locus).or_default();
        if policy == DuplicatePolicy::Replace {
            let replaced: Vec<_> = records.iter().map(FrequencyRecord::identity).collect();
            attached.retain(|existing| !replaced.contains(&existing.identity()));
        }
        attached.extend(records.iter().cloned());
        Ok(records.len())
    }

    fn frequencies_for_locus(&self, locus: LocusId) -> RepoResult<Vec<FrequencyRecord>> {
        Ok(self.frequencies.get(&locus).cloned().unwrap_or_default())
    }

    fn record_run(&mut self, summary: &RunSummary) -> RepoResult<()> {
        self.runs.push(summary.clone());
        Ok(())
    }
}
