//! Minimum-length cutoff search maximising N50.

use crate::error::{Result, SieveError};
use crate::profile::{median, n50_l50};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Default distance between evaluated cutoffs.
pub const DEFAULT_STEP: u64 = 10;

/// Outcome of an N50 cutoff search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct N50Search {
    /// Best cutoff found; 0 when no cutoff improves on the unfiltered N50.
    pub cutoff: u64,
    /// N50 of the lengths that are `>= cutoff`.
    pub n50: f64,
    /// N50 before any filtering.
    pub initial_n50: f64,
    /// Inclusive range that was scanned.
    pub min_cutoff: u64,
    pub max_cutoff: u64,
    pub step: u64,
    /// Number of cutoffs evaluated.
    pub evaluated: usize,
}

impl N50Search {
    fn unfiltered(initial_n50: f64, min_cutoff: u64, max_cutoff: u64, step: u64) -> Self {
        Self {
            cutoff: 0,
            n50: initial_n50,
            initial_n50,
            min_cutoff,
            max_cutoff,
            step,
            evaluated: 0,
        }
    }

    /// Whether the search found a cutoff that raises N50.
    pub fn improved(&self) -> bool {
        self.cutoff > 0
    }
}

/// Lengths sorted longest first, with N50/L50 over any `>= cutoff` prefix.
pub(crate) struct SortedLengths {
    desc: Vec<u64>,
}

impl SortedLengths {
    pub(crate) fn new(lengths: &[u64]) -> Self {
        let mut desc = lengths.to_vec();
        desc.sort_unstable_by(|a, b| b.cmp(a));
        Self { desc }
    }

    /// The lengths that survive a minimum-length filter at `cutoff`.
    pub(crate) fn kept(&self, cutoff: u64) -> &[u64] {
        let n = self.desc.partition_point(|&l| l >= cutoff);
        &self.desc[..n]
    }

    /// N50 and L50 after keeping lengths `>= cutoff`.
    pub(crate) fn n50_l50_at(&self, cutoff: u64) -> (f64, usize) {
        let kept = self.kept(cutoff);
        let total: u64 = kept.iter().sum();
        let half = total as f64 / 2.0;
        let mut running = 0u64;
        for (i, &len) in kept.iter().enumerate() {
            running += len;
            if running as f64 >= half {
                return (len as f64, i + 1);
            }
        }
        (0.0, 0)
    }
}

/// Scan minimum-length cutoffs and keep the one giving the highest N50.
///
/// `min_cutoff` defaults to `max(1, min / 10)` and `max_cutoff` to the
/// median length; both ends are inclusive. A cutoff only replaces the
/// current best when its N50 is strictly higher, so ties keep the smaller
/// cutoff and the unfiltered N50 is the baseline.
pub fn find_optimal_cutoff(
    lengths: &[u64],
    min_cutoff: Option<u64>,
    max_cutoff: Option<u64>,
    step: u64,
) -> Result<N50Search> {
    if step == 0 {
        return Err(SieveError::InvalidParameter(
            "N50 search step must be at least 1".to_string(),
        ));
    }
    let Some(&min_length) = lengths.iter().min() else {
        return Ok(N50Search::unfiltered(0.0, 0, 0, step));
    };

    let min_cutoff = min_cutoff.unwrap_or_else(|| (min_length / 10).max(1));
    let max_cutoff = max_cutoff.unwrap_or_else(|| median(lengths).floor() as u64);

    let sorted = SortedLengths::new(lengths);
    let (initial_n50, _) = n50_l50(lengths);
    let mut search = N50Search::unfiltered(initial_n50, min_cutoff, max_cutoff, step);

    let mut cutoff = min_cutoff;
    while cutoff <= max_cutoff {
        let (n50, _) = sorted.n50_l50_at(cutoff);
        search.evaluated += 1;
        if n50 > search.n50 {
            debug!(cutoff = cutoff, n50 = n50; "n50 improved");
            search.n50 = n50;
            search.cutoff = cutoff;
        }
        cutoff = match cutoff.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }

    info!(
        cutoff = search.cutoff,
        n50 = search.n50,
        initial_n50 = search.initial_n50,
        evaluated = search.evaluated;
        "n50 cutoff search finished"
    );
    Ok(search)
}

/// N50 search that stops before the filter removes too much.
///
/// Cutoffs `0, 10, 20, ...` below the median are tried in order; the scan
/// ends at the first cutoff that would keep fewer than `min_sequence_pct`
/// percent of the sequences or `min_length_pct` percent of the bases.
pub fn optimize_with_retention(
    lengths: &[u64],
    min_sequence_pct: f64,
    min_length_pct: f64,
) -> Result<N50Search> {
    for (name, pct) in [
        ("min_sequence_pct", min_sequence_pct),
        ("min_length_pct", min_length_pct),
    ] {
        if !(0.0..=100.0).contains(&pct) {
            return Err(SieveError::InvalidParameter(format!(
                "{} must be within [0, 100], got {}",
                name, pct
            )));
        }
    }
    if lengths.is_empty() {
        return Ok(N50Search::unfiltered(0.0, 0, 0, DEFAULT_STEP));
    }

    let total_seqs = lengths.len() as f64;
    let total_length: u64 = lengths.iter().sum();
    let min_seqs = (total_seqs * min_sequence_pct / 100.0).floor() as usize;
    let min_bases = (total_length as f64 * min_length_pct / 100.0).floor() as u64;
    let upper = median(lengths).floor() as u64;

    let sorted = SortedLengths::new(lengths);
    let (initial_n50, _) = n50_l50(lengths);
    let mut search = N50Search::unfiltered(initial_n50, 0, upper, DEFAULT_STEP);

    let mut cutoff = 0;
    while cutoff < upper {
        let kept = sorted.kept(cutoff);
        if kept.len() < min_seqs || kept.iter().sum::<u64>() < min_bases {
            debug!(cutoff = cutoff, kept = kept.len(); "retention limit reached");
            break;
        }
        let (n50, _) = sorted.n50_l50_at(cutoff);
        search.evaluated += 1;
        if n50 > search.n50 {
            search.n50 = n50;
            search.cutoff = cutoff;
        }
        cutoff += DEFAULT_STEP;
    }

    info!(
        cutoff = search.cutoff,
        n50 = search.n50,
        min_sequence_pct = min_sequence_pct,
        min_length_pct = min_length_pct;
        "retention-bounded n50 search finished"
    );
    Ok(search)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tail_heavy() -> Vec<u64> {
        let mut lengths = vec![100; 10];
        lengths.extend(vec![60; 90]);
        lengths
    }

    #[test]
    fn test_prefix_matches_direct_n50() {
        let lengths = vec![5, 80, 12, 300, 45, 45, 7, 150];
        let sorted = SortedLengths::new(&lengths);
        for cutoff in [0, 6, 12, 46, 150, 301] {
            let filtered: Vec<u64> = lengths.iter().copied().filter(|&l| l >= cutoff).collect();
            assert_eq!(sorted.n50_l50_at(cutoff), n50_l50(&filtered));
        }
    }

    #[test]
    fn test_finds_cutoff_removing_short_tail() {
        // Initial N50 is 60; dropping the 60s leaves N50 = 100
        let lengths = tail_heavy();
        let search = find_optimal_cutoff(&lengths, Some(50), Some(100), 10).unwrap();
        assert_relative_eq!(search.initial_n50, 60.0);
        assert_eq!(search.cutoff, 70);
        assert_relative_eq!(search.n50, 100.0);
        assert_eq!(search.evaluated, 6);
        assert!(search.improved());
    }

    #[test]
    fn test_no_improvement_keeps_baseline() {
        // The long sequences already dominate the N50
        let mut lengths = vec![100; 10];
        lengths.extend(vec![10; 90]);
        let search = find_optimal_cutoff(&lengths, Some(50), Some(100), 10).unwrap();
        assert_relative_eq!(search.initial_n50, 100.0);
        assert_eq!(search.cutoff, 0);
        assert!(!search.improved());
    }

    #[test]
    fn test_default_range() {
        let lengths = vec![200, 300, 400, 500, 5000];
        let search = find_optimal_cutoff(&lengths, None, None, DEFAULT_STEP).unwrap();
        assert_eq!(search.min_cutoff, 20);
        assert_eq!(search.max_cutoff, 400);
        // Keeping only 5000 is out of range; best N50 stays the 5000 baseline
        assert_relative_eq!(search.n50, 5000.0);
    }

    #[test]
    fn test_invalid_step_and_empty_input() {
        assert!(find_optimal_cutoff(&[1, 2, 3], None, None, 0).is_err());
        let search = find_optimal_cutoff(&[], None, None, 10).unwrap();
        assert_eq!(search.cutoff, 0);
        assert_eq!(search.n50, 0.0);
    }

    #[test]
    fn test_retention_limits_search() {
        let mut lengths = vec![10; 40];
        lengths.extend(vec![100; 60]);
        // Cutoff 20 drops the 10s and keeps only 60% of sequences
        let bounded = optimize_with_retention(&lengths, 70.0, 0.0).unwrap();
        assert_eq!(bounded.evaluated, 2);
        assert_eq!(bounded.cutoff, 0);
        assert_relative_eq!(bounded.n50, 100.0);

        let unbounded = optimize_with_retention(&lengths, 0.0, 0.0).unwrap();
        assert_eq!(unbounded.max_cutoff, 100);
        assert_eq!(unbounded.evaluated, 10);

        // Dropping the 10s keeps 6000 of 6400 bases, under 95%
        let by_bases = optimize_with_retention(&lengths, 0.0, 95.0).unwrap();
        assert_eq!(by_bases.evaluated, 2);
        assert!(optimize_with_retention(&lengths, 120.0, 0.0).is_err());
    }
}
