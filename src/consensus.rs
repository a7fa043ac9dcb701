//! Consensus elevated phase set across several bin counts.
//!
//! Each bin count nominates its top-N bins by excess over the uniform
//! expectation. Because bin widths differ, nominations only partially overlap;
//! the phase axis is cut at every nominated bin edge and a sub-interval is kept
//! when enough bin counts nominate a bin covering its midpoint.

use crate::binning::bin_counts;
use crate::error::{Error, Result};
use crate::intervals::PhaseInterval;
use serde::Serialize;
use tracing::info;

/// Adjacency tolerance when merging consecutive sub-intervals.
const MERGE_TOLERANCE: f64 = 1e-12;

/// Top-N nominated bins at one bin count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopBins {
    /// Number of bins
    pub k: usize,
    /// Nominated bin indices, ascending
    pub bins: Vec<usize>,
    /// Observed minus expected count for each nominated bin
    pub deviations: Vec<f64>,
    /// Phase range of each nominated bin
    pub phase_ranges: Vec<PhaseInterval>,
}

/// Phase intervals supported by several bin counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsensusSet {
    /// Nominations per bin count
    pub per_k: Vec<TopBins>,
    /// Merged consensus intervals
    pub intervals: Vec<PhaseInterval>,
    /// Total phase fraction covered by the intervals
    pub coverage: f64,
    /// Events inside the intervals
    pub n_inside: usize,
    /// Percentage of events inside the intervals
    pub inside_pct: f64,
    /// Percentage expected inside under a uniform null (coverage * 100)
    pub expected_pct: f64,
}

/// The `top_n` bins with the largest excess over `n / k`.
///
/// Ties are broken towards the lower bin index. The result is sorted by bin.
pub fn top_bins(counts: &[usize], top_n: usize) -> TopBins {
    let k = counts.len();
    let n: usize = counts.iter().sum();
    let expected = n as f64 / k.max(1) as f64;

    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by(|&a, &b| counts[b].cmp(&counts[a]).then(a.cmp(&b)));
    let mut bins: Vec<usize> = order.into_iter().take(top_n).collect();
    bins.sort_unstable();

    TopBins {
        k,
        deviations: bins.iter().map(|&b| counts[b] as f64 - expected).collect(),
        phase_ranges: bins
            .iter()
            .map(|&b| PhaseInterval::new(b as f64 / k as f64, (b + 1) as f64 / k as f64))
            .collect(),
        bins,
    }
}

/// Merge sorted intervals that overlap or touch.
pub fn merge_intervals(sorted: &[PhaseInterval]) -> Vec<PhaseInterval> {
    let mut merged: Vec<PhaseInterval> = Vec::new();
    for iv in sorted {
        match merged.last_mut() {
            Some(last) if iv.phase_start <= last.phase_end + MERGE_TOLERANCE => {
                last.phase_end = last.phase_end.max(iv.phase_end);
            }
            _ => merged.push(*iv),
        }
    }
    merged
}

/// Consensus elevated phase set.
///
/// # Arguments
/// * `phases` - Phase fractions in [0, 1)
/// * `bin_counts_list` - Bin counts that vote (e.g. 16, 24, 32)
/// * `top_n` - Bins nominated per bin count
/// * `min_votes` - Bin counts that must cover a sub-interval
pub fn consensus_elevated_set(
    phases: &[f64],
    bin_counts_list: &[usize],
    top_n: usize,
    min_votes: usize,
) -> Result<ConsensusSet> {
    if phases.is_empty() {
        return Err(Error::EmptyInput("consensus set needs at least one event"));
    }
    if min_votes == 0 || min_votes > bin_counts_list.len() {
        return Err(Error::InvalidParameter(format!(
            "min_votes must be in 1..={}, got {min_votes}",
            bin_counts_list.len()
        )));
    }

    let per_k: Vec<TopBins> = bin_counts_list
        .iter()
        .map(|&k| bin_counts(phases, k).map(|counts| top_bins(&counts, top_n)))
        .collect::<Result<_>>()?;

    let mut breakpoints: Vec<f64> = vec![0.0, 1.0];
    for tb in &per_k {
        for r in &tb.phase_ranges {
            breakpoints.push(r.phase_start);
            breakpoints.push(r.phase_end);
        }
    }
    breakpoints.sort_by(f64::total_cmp);
    breakpoints.dedup_by(|a, b| (*a - *b).abs() < MERGE_TOLERANCE);

    let candidates: Vec<PhaseInterval> = breakpoints
        .windows(2)
        .map(|w| PhaseInterval::new(w[0], w[1]))
        .filter(|sub| {
            let mid = sub.midpoint();
            let votes = per_k
                .iter()
                .filter(|tb| tb.phase_ranges.iter().any(|r| r.contains(mid)))
                .count();
            votes >= min_votes
        })
        .collect();

    let intervals = merge_intervals(&candidates);
    let coverage: f64 = intervals.iter().map(PhaseInterval::width).sum();
    let n_inside = phases
        .iter()
        .filter(|&&p| intervals.iter().any(|iv| iv.contains(p)))
        .count();
    let inside_pct = n_inside as f64 / phases.len() as f64 * 100.0;

    info!(
        n_intervals = intervals.len(),
        n_inside,
        inside_pct,
        expected_pct = coverage * 100.0,
        "consensus elevated set"
    );

    Ok(ConsensusSet {
        per_k,
        intervals,
        coverage,
        n_inside,
        inside_pct,
        expected_pct: coverage * 100.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_bins_tie_break() {
        let tb = top_bins(&[5, 9, 9, 1, 9], 2);
        assert_eq!(tb.bins, vec![1, 2]);
        // expected = 33 / 5 = 6.6
        assert!((tb.deviations[0] - 2.4).abs() < 1e-12);
        assert_eq!(tb.phase_ranges[0], PhaseInterval::new(0.2, 0.4));
    }

    #[test]
    fn test_merge_intervals_touching() {
        let merged = merge_intervals(&[
            PhaseInterval::new(0.1, 0.2),
            PhaseInterval::new(0.2, 0.25),
            PhaseInterval::new(0.5, 0.6),
        ]);
        assert_eq!(
            merged,
            vec![PhaseInterval::new(0.1, 0.25), PhaseInterval::new(0.5, 0.6)]
        );
    }

    #[test]
    fn test_consensus_recovers_common_peak() {
        // Background of one event per 1/96 phase, plus a peak at 0.2
        let mut phases: Vec<f64> = (0..960).map(|i| (i as f64 + 0.5) / 960.0).collect();
        phases.extend(std::iter::repeat(0.2).take(200));

        let set = consensus_elevated_set(&phases, &[16, 24, 32], 3, 2).unwrap();
        assert_eq!(set.per_k.len(), 3);
        assert!(!set.intervals.is_empty());
        assert!(set.intervals.iter().any(|iv| iv.contains(0.2)));
        assert!(set.n_inside >= 200);
        assert!(set.inside_pct > set.expected_pct);
        assert!((set.expected_pct - set.coverage * 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_consensus_rejects_bad_votes() {
        assert!(consensus_elevated_set(&[0.1], &[16, 24], 3, 3).is_err());
        assert!(consensus_elevated_set(&[], &[16], 3, 1).is_err());
    }
}
