//! Modified Fourier Power Analysis (MFPA).
//!
//! Power at a candidate period is `|Σ exp(iφ)|² / n`, the squared modulus of
//! the unnormalised resultant divided by the event count (equivalently
//! `n·R²`). Significance comes from a bootstrap null of uniform phases rather
//! than an asymptotic distribution.
//!
//! The null does not depend on the period (uniform phases are uniform at every
//! period), so it is drawn once per catalog size and reused across the grid.

use crate::circular::{phase_unchecked, TWO_PI};
use crate::error::{Error, Result};
use crate::helpers::{
    ensure_finite, log_spaced_grid, percentile_sorted, sorted_copy, validate_period, JULIAN_YEAR_DAYS,
};
use crate::intervals::{a1b_baseline_intervals, BaselineInterval};
use crate::iter_maybe_parallel;
use crate::resampling::replicate_rng;
use num_complex::Complex;
use rand::Rng;
use rand_distr::Uniform;
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Parameters of an MFPA scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MfpaParams {
    /// Number of log-spaced periods
    pub n_periods: usize,
    /// Shortest period (days)
    pub min_period_days: f64,
    /// Longest period (days)
    pub max_period_days: f64,
    /// Bootstrap replicates in the null
    pub n_bootstrap: usize,
    /// Root seed of the bootstrap stream
    pub seed: u64,
}

impl Default for MfpaParams {
    fn default() -> Self {
        Self {
            n_periods: 300,
            min_period_days: 0.25,
            max_period_days: 548.0,
            n_bootstrap: 1000,
            seed: 42,
        }
    }
}

impl MfpaParams {
    /// Check grid bounds and replicate count.
    pub fn validate(&self) -> Result<()> {
        if self.n_bootstrap == 0 {
            return Err(Error::InvalidParameter(
                "MFPA needs at least one bootstrap replicate".into(),
            ));
        }
        // Grid construction validates n_periods and the bounds
        log_spaced_grid(self.n_periods, self.min_period_days, self.max_period_days).map(|_| ())
    }
}

/// 95th and 99th percentile of the bootstrap null.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NullPercentiles {
    /// 95th percentile power
    pub p95: f64,
    /// 99th percentile power
    pub p99: f64,
}

/// One period of an MFPA spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MfpaPoint {
    /// Candidate period (days)
    pub period_days: f64,
    /// Observed power
    pub power: f64,
    /// 95th percentile of the null
    pub p95_threshold: f64,
    /// 99th percentile of the null
    pub p99_threshold: f64,
    /// Fraction of null powers at or above the observed power
    pub p_value: f64,
    /// Which baseline phase intervals the period's harmonics hit
    pub baseline_consistency: String,
}

/// A period whose power exceeds the 95th percentile threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificantPeriod {
    /// Period (days)
    pub period_days: f64,
    /// Observed power
    pub power: f64,
    /// Bootstrap p-value
    pub p_value: f64,
    /// Baseline consistency label
    pub baseline_consistency: String,
}

/// Result of an MFPA scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MfpaScan {
    /// Number of events scanned
    pub n_events: usize,
    /// One entry per grid period, in grid order
    pub spectrum: Vec<MfpaPoint>,
    /// Entries with power above the 95th percentile threshold
    pub significant_periods: Vec<SignificantPeriod>,
}

// ============================================================================
// Power and null
// ============================================================================

/// MFPA power `|Σ exp(iφ)|² / n` of a set of angles (radians). Empty -> 0.
pub fn mfpa_power(angles: &[f64]) -> f64 {
    if angles.is_empty() {
        return 0.0;
    }
    let sum: Complex<f64> = angles.iter().map(|&phi| Complex::from_polar(1.0, phi)).sum();
    sum.norm_sqr() / angles.len() as f64
}

/// MFPA power at a period, computed directly from event times.
pub(crate) fn power_at_period(times: &[f64], period: f64) -> f64 {
    if times.is_empty() {
        return 0.0;
    }
    let sum: Complex<f64> = times
        .iter()
        .map(|&t| Complex::from_polar(1.0, TWO_PI * phase_unchecked(t, period)))
        .sum();
    sum.norm_sqr() / times.len() as f64
}

/// Null MFPA powers of `n_bootstrap` samples of `n` uniform phases on [0, 2π).
///
/// Replicate `i` draws from its own generator seeded from `(seed, i)`, so the
/// returned vector is identical with or without the `parallel` feature.
pub fn bootstrap_null_powers(n: usize, n_bootstrap: usize, seed: u64) -> Vec<f64> {
    let uniform = Uniform::new(0.0, TWO_PI);
    iter_maybe_parallel!(0..n_bootstrap)
        .map(|i| {
            let mut rng = replicate_rng(seed, i);
            let angles: Vec<f64> = (0..n).map(|_| rng.sample(uniform)).collect();
            mfpa_power(&angles)
        })
        .collect()
}

/// 95th and 99th percentiles of the bootstrap null for `n` events.
///
/// # Arguments
/// * `n` - Number of events
/// * `n_bootstrap` - Number of replicates (>= 1)
/// * `seed` - Root seed
pub fn bootstrap_null_percentiles(n: usize, n_bootstrap: usize, seed: u64) -> Result<NullPercentiles> {
    if n_bootstrap == 0 {
        return Err(Error::InvalidParameter(
            "MFPA needs at least one bootstrap replicate".into(),
        ));
    }
    let sorted = sorted_copy(&bootstrap_null_powers(n, n_bootstrap, seed));
    Ok(NullPercentiles {
        p95: percentile_sorted(&sorted, 95.0),
        p99: percentile_sorted(&sorted, 99.0),
    })
}

/// Fraction of sorted null values at or above `observed`.
fn upper_tail_fraction(sorted_null: &[f64], observed: f64) -> f64 {
    if sorted_null.is_empty() {
        return 1.0;
    }
    let below = sorted_null.partition_point(|&v| v < observed);
    (sorted_null.len() - below) as f64 / sorted_null.len() as f64
}

// ============================================================================
// Baseline consistency
// ============================================================================

/// Label naming which baseline intervals the harmonics of a period hit.
///
/// Predicted peak phases are `(k·period / 365.25) mod 1` for
/// `k = 0..=max(1, floor(365.25 / period))`. A baseline is hit when a predicted
/// phase lies in its closed interval. Baselines are numbered by position
/// (1-based) in `baselines`.
///
/// # Errors
/// Returns `Error::InvalidPeriod` for a zero, negative or non-finite period.
pub fn baseline_consistency_label(period_days: f64, baselines: &[BaselineInterval]) -> Result<String> {
    validate_period(period_days)?;
    let n_harmonics = ((JULIAN_YEAR_DAYS / period_days).floor() as usize).max(1);
    let mut hits = vec![false; baselines.len()];
    for k in 0..=n_harmonics {
        let predicted = (k as f64 * period_days / JULIAN_YEAR_DAYS).rem_euclid(1.0);
        for (hit, b) in hits.iter_mut().zip(baselines) {
            if b.phase_start <= predicted && predicted <= b.phase_end {
                *hit = true;
            }
        }
    }

    let hit_ids: Vec<usize> = hits
        .iter()
        .enumerate()
        .filter(|(_, &h)| h)
        .map(|(i, _)| i + 1)
        .collect();

    let label = match hit_ids.as_slice() {
        [] => "inconsistent with all A1b intervals".to_string(),
        [1] => "consistent with interval 1 only".to_string(),
        [1, 2] => "consistent with intervals 1+2".to_string(),
        [1, 3] => "consistent with intervals 1+3 (6-month)".to_string(),
        [2, 3] => "consistent with intervals 2+3".to_string(),
        [1, 2, 3] => "consistent with all three intervals (4-month if applicable)".to_string(),
        ids => {
            let joined: Vec<String> = ids.iter().map(|i| i.to_string()).collect();
            format!("consistent with intervals {}", joined.join("+"))
        }
    };
    Ok(label)
}

// ============================================================================
// Scan
// ============================================================================

/// MFPA scan against the A1b baseline intervals.
pub fn mfpa_scan(times: &[f64], params: &MfpaParams) -> Result<MfpaScan> {
    mfpa_scan_with_baselines(times, params, &a1b_baseline_intervals())
}

/// MFPA scan over a log-spaced period grid.
///
/// # Arguments
/// * `times` - Event times in days
/// * `params` - Grid and bootstrap settings
/// * `baselines` - Phase intervals used for the consistency label
///
/// # Returns
/// Spectrum in grid order plus the periods whose power exceeds the 95th
/// percentile of the null.
pub fn mfpa_scan_with_baselines(
    times: &[f64],
    params: &MfpaParams,
    baselines: &[BaselineInterval],
) -> Result<MfpaScan> {
    params.validate()?;
    ensure_finite(times)?;
    let grid = log_spaced_grid(params.n_periods, params.min_period_days, params.max_period_days)?;
    let n = times.len();

    info!(
        n_events = n,
        n_periods = params.n_periods,
        n_bootstrap = params.n_bootstrap,
        "running MFPA scan"
    );
    if n == 0 {
        warn!("MFPA scan on empty time array, every period gets power 0 and p = 1");
    }

    let null_sorted = sorted_copy(&bootstrap_null_powers(n, params.n_bootstrap, params.seed));
    let p95 = percentile_sorted(&null_sorted, 95.0);
    let p99 = percentile_sorted(&null_sorted, 99.0);
    debug!(p95, p99, "MFPA bootstrap null thresholds");

    let spectrum: Vec<MfpaPoint> = iter_maybe_parallel!(0..grid.len())
        .map(|j| {
            let period = grid[j];
            let power = power_at_period(times, period);
            Ok(MfpaPoint {
                period_days: period,
                power,
                p95_threshold: p95,
                p99_threshold: p99,
                p_value: upper_tail_fraction(&null_sorted, power),
                baseline_consistency: baseline_consistency_label(period, baselines)?,
            })
        })
        .collect::<Result<_>>()?;

    let significant_periods: Vec<SignificantPeriod> = spectrum
        .iter()
        .filter(|p| p.power > p.p95_threshold)
        .map(|p| SignificantPeriod {
            period_days: p.period_days,
            power: p.power,
            p_value: p.p_value,
            baseline_consistency: p.baseline_consistency.clone(),
        })
        .collect();

    info!(
        n_significant = significant_periods.len(),
        "MFPA scan complete"
    );

    Ok(MfpaScan {
        n_events: n,
        spectrum,
        significant_periods,
    })
}
