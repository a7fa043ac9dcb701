//! Phase-bin histograms and the uniformity statistics computed on them.

use crate::circular::rayleigh;
use crate::error::{Error, Result};
use crate::helpers::{ensure_finite, percentile_sorted, sorted_copy};
use crate::iter_maybe_parallel;
use crate::resampling::{bootstrap_indices, replicate_rng};
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};
use tracing::debug;

/// Bin counts analysed by default.
pub const DEFAULT_BIN_COUNTS: [usize; 3] = [16, 24, 32];
/// Bin count used for survival and cross-stratum comparisons.
pub const CANONICAL_BIN_COUNT: usize = 24;

/// Chi-square goodness-of-fit test against a uniform histogram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChiSquareTest {
    /// Chi-square statistic
    pub chi2: f64,
    /// Upper-tail p-value
    pub p_value: f64,
    /// Degrees of freedom (k - 1)
    pub dof: usize,
}

/// Uniformity statistics of a phase set at one bin count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinStats {
    /// Number of phases
    pub n: usize,
    /// Number of bins
    pub k: usize,
    /// Observed count per bin
    pub counts: Vec<usize>,
    /// Expected count per bin (n / k)
    pub expected: f64,
    /// Chi-square statistic
    pub chi2: f64,
    /// Chi-square p-value
    pub p_chi2: f64,
    /// Cramér's V effect size
    pub cramer_v: f64,
    /// Rayleigh mean resultant length
    pub rayleigh_r: f64,
    /// Rayleigh p-value
    pub p_rayleigh: f64,
    /// Mean phase fraction
    pub mean_phase: f64,
}

/// Percentile bootstrap interval for Cramér's V.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CramerVInterval {
    /// 2.5th percentile
    pub lower: f64,
    /// 97.5th percentile
    pub upper: f64,
}

fn validate_bin_count(k: usize) -> Result<()> {
    if k < 2 {
        return Err(Error::InvalidParameter(format!(
            "need at least 2 phase bins, got {k}"
        )));
    }
    Ok(())
}

/// Bin index `floor(phase * k)` clamped to `[0, k - 1]`.
#[inline]
pub fn bin_index(phase: f64, k: usize) -> usize {
    let raw = (phase * k as f64).floor();
    if raw <= 0.0 {
        0
    } else {
        (raw as usize).min(k - 1)
    }
}

/// Histogram of phase fractions over `k` equal-width bins.
pub fn bin_counts(phases: &[f64], k: usize) -> Result<Vec<usize>> {
    validate_bin_count(k)?;
    ensure_finite(phases)?;
    Ok(counts_unchecked(phases, k))
}

fn counts_unchecked(phases: &[f64], k: usize) -> Vec<usize> {
    let mut counts = vec![0usize; k];
    for &p in phases {
        counts[bin_index(p, k)] += 1;
    }
    counts
}

fn chi2_statistic(counts: &[usize], n: usize) -> f64 {
    let expected = n as f64 / counts.len() as f64;
    counts
        .iter()
        .map(|&o| {
            let d = o as f64 - expected;
            d * d / expected
        })
        .sum()
}

/// Chi-square test of a histogram against equal expected counts.
///
/// # Errors
/// `InvalidParameter` for fewer than two bins, `EmptyInput` when every bin is empty.
pub fn chi_square_uniform(counts: &[usize]) -> Result<ChiSquareTest> {
    validate_bin_count(counts.len())?;
    let n: usize = counts.iter().sum();
    if n == 0 {
        return Err(Error::EmptyInput("chi-square needs at least one event"));
    }
    let chi2 = chi2_statistic(counts, n);
    let dof = counts.len() - 1;
    let dist = ChiSquared::new(dof as f64).map_err(|e| Error::InvalidParameter(e.to_string()))?;
    Ok(ChiSquareTest {
        chi2,
        p_value: dist.sf(chi2),
        dof,
    })
}

/// Cramér's V for a one-way table, `sqrt(chi2 / (n (k - 1)))`.
pub fn cramers_v(chi2: f64, n: usize, k: usize) -> Result<f64> {
    validate_bin_count(k)?;
    if n == 0 {
        return Err(Error::EmptyInput("Cramér's V needs at least one event"));
    }
    Ok((chi2 / (n * (k - 1)) as f64).sqrt())
}

/// Chi-square, Cramér's V and Rayleigh statistics of a phase set at `k` bins.
///
/// # Arguments
/// * `phases` - Phase fractions in [0, 1)
/// * `k` - Number of bins (>= 2)
pub fn bin_statistics(phases: &[f64], k: usize) -> Result<BinStats> {
    let counts = bin_counts(phases, k)?;
    let n = phases.len();
    let chi = chi_square_uniform(&counts)?;
    let v = cramers_v(chi.chi2, n, k)?;
    let ray = rayleigh(phases);

    debug!(n, k, chi2 = chi.chi2, p = chi.p_value, cramer_v = v, "bin statistics");

    Ok(BinStats {
        n,
        k,
        counts,
        expected: n as f64 / k as f64,
        chi2: chi.chi2,
        p_chi2: chi.p_value,
        cramer_v: v,
        rayleigh_r: ray.r,
        p_rayleigh: ray.p_value,
        mean_phase: ray.mean_phase,
    })
}

/// 95% percentile bootstrap interval of Cramér's V.
///
/// Each replicate resamples the phases with replacement using the generator
/// for `(seed, replicate)`.
pub fn bootstrap_cramers_v_ci(
    phases: &[f64],
    k: usize,
    n_bootstrap: usize,
    seed: u64,
) -> Result<CramerVInterval> {
    validate_bin_count(k)?;
    ensure_finite(phases)?;
    let n = phases.len();
    if n == 0 {
        return Err(Error::EmptyInput("bootstrap interval needs at least one event"));
    }
    if n_bootstrap == 0 {
        return Err(Error::InvalidParameter(
            "bootstrap interval needs at least one replicate".into(),
        ));
    }

    let values: Vec<f64> = iter_maybe_parallel!(0..n_bootstrap)
        .map(|i| {
            let mut rng = replicate_rng(seed, i);
            let mut counts = vec![0usize; k];
            for idx in bootstrap_indices(&mut rng, n) {
                counts[bin_index(phases[idx], k)] += 1;
            }
            (chi2_statistic(&counts, n) / (n * (k - 1)) as f64).sqrt()
        })
        .collect();

    let sorted = sorted_copy(&values);
    Ok(CramerVInterval {
        lower: percentile_sorted(&sorted, 2.5),
        upper: percentile_sorted(&sorted, 97.5),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bin_centers(k: usize, per_bin: usize) -> Vec<f64> {
        (0..k)
            .flat_map(|b| std::iter::repeat((b as f64 + 0.5) / k as f64).take(per_bin))
            .collect()
    }

    #[test]
    fn test_bin_index_clamps() {
        assert_eq!(bin_index(0.0, 24), 0);
        assert_eq!(bin_index(0.999_999, 24), 23);
        assert_eq!(bin_index(1.0, 24), 23);
        assert_eq!(bin_index(-0.01, 24), 0);
        assert_eq!(bin_index(0.5, 24), 12);
    }

    #[test]
    fn test_bin_counts_sum() {
        let phases = bin_centers(16, 3);
        let counts = bin_counts(&phases, 16).unwrap();
        assert_eq!(counts, vec![3; 16]);
        assert!(bin_counts(&phases, 1).is_err());
    }

    #[test]
    fn test_chi_square_uniform_histogram() {
        let test = chi_square_uniform(&[10; 24]).unwrap();
        assert_eq!(test.dof, 23);
        assert!(test.chi2.abs() < 1e-12);
        assert!((test.p_value - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_chi_square_known_value() {
        // (30-20)^2/20 + (10-20)^2/20 = 10, dof 1 -> p ~ 0.001565
        let test = chi_square_uniform(&[30, 10]).unwrap();
        assert!((test.chi2 - 10.0).abs() < 1e-12);
        assert!((test.p_value - 0.001_565_402_6).abs() < 1e-6);
    }

    #[test]
    fn test_chi_square_empty_errors() {
        assert!(matches!(chi_square_uniform(&[0; 5]), Err(Error::EmptyInput(_))));
    }

    #[test]
    fn test_cramers_v() {
        assert!((cramers_v(10.0, 40, 2).unwrap() - 0.5).abs() < 1e-12);
        assert!(cramers_v(1.0, 0, 24).is_err());
    }

    #[test]
    fn test_bin_statistics_uniform() {
        let stats = bin_statistics(&bin_centers(24, 10), 24).unwrap();
        assert_eq!(stats.n, 240);
        assert!((stats.expected - 10.0).abs() < 1e-12);
        assert!(stats.chi2.abs() < 1e-12);
        assert!(stats.cramer_v.abs() < 1e-12);
        assert!(stats.rayleigh_r < 1e-9);
    }

    #[test]
    fn test_bin_statistics_spike() {
        let mut phases = bin_centers(24, 100);
        phases.extend(std::iter::repeat(0.5 / 24.0).take(500));
        let stats = bin_statistics(&phases, 24).unwrap();
        assert!(stats.p_chi2 < 0.01);
        assert_eq!(stats.counts[0], 600);
    }

    #[test]
    fn test_bootstrap_ci_brackets_point_estimate() {
        let mut phases = bin_centers(24, 20);
        phases.extend(std::iter::repeat(0.1).take(60));
        let stats = bin_statistics(&phases, 24).unwrap();
        let ci = bootstrap_cramers_v_ci(&phases, 24, 300, 42).unwrap();
        assert!(ci.lower <= ci.upper);
        assert!(ci.lower < stats.cramer_v + 0.05);
        assert!(ci.upper > stats.cramer_v - 0.05);

        let again = bootstrap_cramers_v_ci(&phases, 24, 300, 42).unwrap();
        assert_eq!(ci, again);
    }
}
