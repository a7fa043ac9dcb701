//! Elevated phase-interval detection.
//!
//! A bin is elevated when its count exceeds `E + sqrt(E)` with `E = n / k`,
//! one Poisson standard deviation above the uniform expectation. Adjacent
//! elevated bins merge into intervals, which are then classified against a set
//! of reference (baseline) intervals.
//!
//! Merging treats the bin axis as a line: bin `k - 1` and bin 0 are never
//! joined, so a run straddling phase 0 is reported as two intervals.

use crate::binning::bin_counts;
use crate::circular::mean_resultant_of_phases;
use crate::error::Result;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use tracing::debug;

/// Overlap fraction above which an interval matches a baseline.
pub const DEFAULT_OVERLAP_THRESHOLD: f64 = 0.5;

/// Half-open phase interval `[phase_start, phase_end)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseInterval {
    pub phase_start: f64,
    pub phase_end: f64,
}

impl PhaseInterval {
    pub fn new(phase_start: f64, phase_end: f64) -> Self {
        Self {
            phase_start,
            phase_end,
        }
    }

    pub fn width(&self) -> f64 {
        self.phase_end - self.phase_start
    }

    pub fn midpoint(&self) -> f64 {
        0.5 * (self.phase_start + self.phase_end)
    }

    /// Half-open membership test.
    pub fn contains(&self, phase: f64) -> bool {
        self.phase_start <= phase && phase < self.phase_end
    }
}

/// Reference phase interval recovered in an earlier analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineInterval {
    /// Identifier used in classification labels
    pub id: u32,
    /// Interval start (phase fraction)
    pub phase_start: f64,
    /// Interval end (phase fraction)
    pub phase_end: f64,
    /// Calendar description
    pub label: String,
}

impl BaselineInterval {
    pub fn new(id: u32, phase_start: f64, phase_end: f64, label: impl Into<String>) -> Self {
        Self {
            id,
            phase_start,
            phase_end,
            label: label.into(),
        }
    }

    pub fn interval(&self) -> PhaseInterval {
        PhaseInterval::new(self.phase_start, self.phase_end)
    }
}

/// The three A1b baseline intervals (near March, August and November).
pub fn a1b_baseline_intervals() -> Vec<BaselineInterval> {
    vec![
        BaselineInterval::new(1, 0.1875, 0.25, "~Mar 10 - Apr 1"),
        BaselineInterval::new(2, 0.625, 0.656, "~Aug 16 - Aug 28"),
        BaselineInterval::new(3, 0.875, 0.917, "~Nov 16 - Dec 1"),
    ]
}

/// Classification of a recovered interval against the baselines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalClass {
    /// Overlaps baseline `id` by more than the threshold
    Matches(u32),
    /// Matches no baseline
    New,
}

impl IntervalClass {
    pub fn matched_id(&self) -> Option<u32> {
        match self {
            IntervalClass::Matches(id) => Some(*id),
            IntervalClass::New => None,
        }
    }
}

impl fmt::Display for IntervalClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntervalClass::Matches(id) => write!(f, "matches interval {id}"),
            IntervalClass::New => write!(f, "new interval"),
        }
    }
}

impl Serialize for IntervalClass {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Contiguous run of elevated bins, `end_bin` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinRange {
    pub start_bin: usize,
    pub end_bin: usize,
}

impl BinRange {
    /// Phase interval covered by this range at `k` bins.
    pub fn to_phase_interval(&self, k: usize) -> PhaseInterval {
        PhaseInterval::new(self.start_bin as f64 / k as f64, self.end_bin as f64 / k as f64)
    }
}

/// An elevated phase interval with its classification and coherence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElevatedInterval {
    /// Interval start (phase fraction)
    pub phase_start: f64,
    /// Interval end (phase fraction, exclusive)
    pub phase_end: f64,
    /// Midpoint of the interval
    pub mean_phase: f64,
    /// First bin of the run
    pub start_bin: usize,
    /// One past the last bin of the run
    pub end_bin: usize,
    /// Classification against the baselines
    pub classification: IntervalClass,
    /// Events whose phase falls inside the interval
    pub n_events: usize,
    /// Mean resultant length of those events
    pub r_coherence: f64,
}

impl ElevatedInterval {
    pub fn interval(&self) -> PhaseInterval {
        PhaseInterval::new(self.phase_start, self.phase_end)
    }
}

// ============================================================================
// Detection and merging
// ============================================================================

/// Elevation threshold `E + sqrt(E)`.
#[inline]
pub fn elevation_threshold(expected: f64) -> f64 {
    expected + expected.sqrt()
}

/// Flag bins whose count exceeds `n/k + sqrt(n/k)`.
pub fn detect_elevated_bins(counts: &[usize], n: usize) -> Vec<bool> {
    if counts.is_empty() {
        return Vec::new();
    }
    let threshold = elevation_threshold(n as f64 / counts.len() as f64);
    counts.iter().map(|&c| c as f64 > threshold).collect()
}

/// Maximal runs of `true` in a bin mask, without wrapping from the last bin to bin 0.
pub fn merge_adjacent(mask: &[bool]) -> Vec<BinRange> {
    let mut ranges = Vec::new();
    let mut i = 0;
    while i < mask.len() {
        if mask[i] {
            let start = i;
            while i < mask.len() && mask[i] {
                i += 1;
            }
            ranges.push(BinRange {
                start_bin: start,
                end_bin: i,
            });
        } else {
            i += 1;
        }
    }
    ranges
}

/// Rebuild a `k`-bin mask from merged ranges.
pub fn ranges_to_mask(ranges: &[BinRange], k: usize) -> Vec<bool> {
    let mut mask = vec![false; k];
    for r in ranges {
        for slot in mask.iter_mut().take(r.end_bin.min(k)).skip(r.start_bin) {
            *slot = true;
        }
    }
    mask
}

// ============================================================================
// Classification
// ============================================================================

/// Fraction of interval `a` covered by interval `b` (overlap / width of `a`).
///
/// Zero when `a` has no width.
pub fn overlap_fraction(a: &PhaseInterval, b: &PhaseInterval) -> f64 {
    let width = a.width();
    if width <= 0.0 {
        return 0.0;
    }
    let overlap = (a.phase_end.min(b.phase_end) - a.phase_start.max(b.phase_start)).max(0.0);
    overlap / width
}

/// Classify an interval against the baselines.
///
/// Matches a baseline when `overlap / width(interval) > threshold`. When
/// several baselines match, the first in input order wins.
pub fn classify_against_baseline(
    interval: &PhaseInterval,
    baselines: &[BaselineInterval],
    threshold: f64,
) -> IntervalClass {
    baselines
        .iter()
        .find(|b| overlap_fraction(interval, &b.interval()) > threshold)
        .map_or(IntervalClass::New, |b| IntervalClass::Matches(b.id))
}

/// Mean resultant length of the phases inside `interval`; 0 if none.
pub fn coherence(phases: &[f64], interval: &PhaseInterval) -> f64 {
    let inside: Vec<f64> = phases
        .iter()
        .copied()
        .filter(|&p| interval.contains(p))
        .collect();
    mean_resultant_of_phases(&inside).r
}

/// Number of phases inside `interval`.
pub fn count_in(phases: &[f64], interval: &PhaseInterval) -> usize {
    phases.iter().filter(|&&p| interval.contains(p)).count()
}

/// Bin, detect, merge and classify elevated intervals of a phase set.
///
/// # Arguments
/// * `phases` - Phase fractions in [0, 1)
/// * `k` - Number of bins
/// * `baselines` - Reference intervals for classification
/// * `threshold` - Overlap fraction threshold (usually 0.5)
pub fn find_elevated_intervals(
    phases: &[f64],
    k: usize,
    baselines: &[BaselineInterval],
    threshold: f64,
) -> Result<Vec<ElevatedInterval>> {
    let counts = bin_counts(phases, k)?;
    Ok(elevated_from_counts(phases, &counts, baselines, threshold))
}

/// Same as [`find_elevated_intervals`] with precomputed counts.
pub(crate) fn elevated_from_counts(
    phases: &[f64],
    counts: &[usize],
    baselines: &[BaselineInterval],
    threshold: f64,
) -> Vec<ElevatedInterval> {
    let k = counts.len();
    let mask = detect_elevated_bins(counts, phases.len());
    let ranges = merge_adjacent(&mask);

    let intervals: Vec<ElevatedInterval> = ranges
        .iter()
        .map(|range| {
            let interval = range.to_phase_interval(k);
            ElevatedInterval {
                phase_start: interval.phase_start,
                phase_end: interval.phase_end,
                mean_phase: interval.midpoint(),
                start_bin: range.start_bin,
                end_bin: range.end_bin,
                classification: classify_against_baseline(&interval, baselines, threshold),
                n_events: count_in(phases, &interval),
                r_coherence: coherence(phases, &interval),
            }
        })
        .collect();

    debug!(
        k,
        n_elevated_bins = mask.iter().filter(|&&m| m).count(),
        n_intervals = intervals.len(),
        "elevated intervals"
    );
    intervals
}
