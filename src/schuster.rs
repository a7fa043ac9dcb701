//! Schuster periodicity tests.
//!
//! The standard test sums one unit phase vector per event. The cluster-robust
//! variant first groups time-contiguous events into temporal clusters and lets
//! each cluster vote once, along its mean direction, so aftershock sequences do
//! not inflate the statistic. Both share `D² = (C² + S²) / n` and `p = exp(-D²)`.

use crate::circular::{phase_unchecked, TWO_PI};
use crate::error::Result;
use crate::helpers::{ensure_finite, ensure_sorted, log_spaced_grid, validate_period};
use crate::iter_maybe_parallel;
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Default inter-event gap (days) below which consecutive events share a cluster.
pub const DEFAULT_CLUSTER_GAP_DAYS: f64 = 1.0;
/// Default number of periods in a Schuster spectrum scan.
pub const SPECTRUM_N_PERIODS: usize = 200;
/// Default shortest period (days) of the scan grid.
pub const SPECTRUM_MIN_DAYS: f64 = 0.25;
/// Default longest period (days) of the scan grid.
pub const SPECTRUM_MAX_DAYS: f64 = 548.0;

/// A physically motivated period tested individually.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NamedPeriod {
    /// Short identifier
    pub name: &'static str,
    /// Period in days
    pub period_days: f64,
}

/// Tidal, sub-annual and annual periods checked by [`schuster_named_tests`].
pub const NAMED_PERIODS: [NamedPeriod; 7] = [
    NamedPeriod { name: "tidal_12h", period_days: 0.5 },
    NamedPeriod { name: "tidal_24h", period_days: 1.0 },
    NamedPeriod { name: "tidal_14d", period_days: 14.77 },
    NamedPeriod { name: "tidal_27d", period_days: 27.32 },
    NamedPeriod { name: "third_year_122", period_days: 121.75 },
    NamedPeriod { name: "half_year_182", period_days: 182.625 },
    NamedPeriod { name: "annual_365", period_days: 365.25 },
];

/// Standard Schuster test over all events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardTest {
    /// Number of events
    pub n_events: usize,
    /// D² statistic
    pub d2: f64,
    /// p-value exp(-D²)
    pub p_value: f64,
}

/// Cluster-robust Schuster test (one unit vector per temporal cluster).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterRobustTest {
    /// Number of temporal clusters
    pub n_clusters: usize,
    /// D² statistic over cluster directions
    pub d2: f64,
    /// p-value exp(-D²)
    pub p_value: f64,
}

/// Both Schuster tests at a single period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchusterTest {
    /// Candidate period (days)
    pub period_days: f64,
    /// Standard test
    pub standard: StandardTest,
    /// Cluster-robust test
    pub cluster_robust: ClusterRobustTest,
}

/// One period of a Schuster spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrumPoint {
    /// Candidate period (days)
    pub period_days: f64,
    /// Standard D²
    pub d2_standard: f64,
    /// Standard p-value
    pub p_standard: f64,
    /// Cluster-robust D²
    pub d2_cluster_robust: f64,
    /// Cluster-robust p-value
    pub p_cluster_robust: f64,
}

/// Schuster spectrum over a period grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchusterSpectrum {
    /// Number of events scanned
    pub n_events: usize,
    /// Number of temporal clusters (independent of period)
    pub n_clusters: usize,
    /// Gap threshold used for clustering (days)
    pub gap_days: f64,
    /// One entry per grid period, in grid order
    pub points: Vec<SpectrumPoint>,
}

impl SchusterSpectrum {
    /// Grid point with the smallest standard p-value.
    pub fn most_significant_standard(&self) -> Option<&SpectrumPoint> {
        self.points
            .iter()
            .min_by(|a, b| a.p_standard.total_cmp(&b.p_standard))
    }

    /// Grid point with the smallest cluster-robust p-value.
    pub fn most_significant_cluster_robust(&self) -> Option<&SpectrumPoint> {
        self.points
            .iter()
            .min_by(|a, b| a.p_cluster_robust.total_cmp(&b.p_cluster_robust))
    }

    /// Periods whose cluster-robust p-value is below `alpha`.
    pub fn significant_cluster_robust(&self, alpha: f64) -> Vec<f64> {
        self.points
            .iter()
            .filter(|p| p.p_cluster_robust < alpha)
            .map(|p| p.period_days)
            .collect()
    }
}

/// Schuster tests at a named period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedPeriodTest {
    /// Period identifier
    pub name: &'static str,
    /// Both tests at this period
    pub test: SchusterTest,
}

// ============================================================================
// Clustering and statistic
// ============================================================================

/// Assign temporal cluster ids along a sorted time array.
///
/// A new cluster starts exactly when `t[i] - t[i-1] >= gap_days`. Ids start at
/// 0 and are non-decreasing.
///
/// # Arguments
/// * `sorted_times` - Event times in days, ascending
/// * `gap_days` - Gap threshold (> 0)
///
/// # Errors
/// `UnsortedTimes` if the array is not ascending; the input is never re-sorted.
pub fn assign_clusters(sorted_times: &[f64], gap_days: f64) -> Result<Vec<usize>> {
    validate_gap(gap_days)?;
    ensure_sorted(sorted_times)?;
    Ok(cluster_ids_unchecked(sorted_times, gap_days))
}

fn cluster_ids_unchecked(sorted_times: &[f64], gap_days: f64) -> Vec<usize> {
    let mut ids = Vec::with_capacity(sorted_times.len());
    let mut current = 0usize;
    for (i, &t) in sorted_times.iter().enumerate() {
        if i > 0 && t - sorted_times[i - 1] >= gap_days {
            current += 1;
        }
        ids.push(current);
    }
    ids
}

fn validate_gap(gap_days: f64) -> Result<()> {
    if gap_days.is_finite() && gap_days > 0.0 {
        Ok(())
    } else {
        Err(crate::error::Error::InvalidParameter(format!(
            "cluster gap must be strictly positive and finite, got {gap_days}"
        )))
    }
}

/// Number of clusters in an id vector produced by [`assign_clusters`].
pub fn n_clusters(cluster_ids: &[usize]) -> usize {
    cluster_ids.last().map_or(0, |&last| last + 1)
}

/// Schuster D² = (C² + S²) / n; zero when `n == 0`.
#[inline]
pub fn d2_statistic(cos_sum: f64, sin_sum: f64, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    (cos_sum * cos_sum + sin_sum * sin_sum) / n as f64
}

/// Schuster p-value exp(-D²).
#[inline]
pub fn p_from_d2(d2: f64) -> f64 {
    (-d2).exp().min(1.0)
}

fn resultant_sums(times: &[f64], period: f64) -> (f64, f64) {
    let (mut c, mut s) = (0.0, 0.0);
    for &t in times {
        let angle = TWO_PI * phase_unchecked(t, period);
        c += angle.cos();
        s += angle.sin();
    }
    (c, s)
}

fn standard_unchecked(times: &[f64], period: f64) -> StandardTest {
    let (c, s) = resultant_sums(times, period);
    let d2 = d2_statistic(c, s, times.len());
    StandardTest {
        n_events: times.len(),
        d2,
        p_value: p_from_d2(d2),
    }
}

/// Cluster-robust statistic given precomputed cluster ids.
fn cluster_robust_unchecked(times: &[f64], cluster_ids: &[usize], period: f64) -> ClusterRobustTest {
    let n_cl = n_clusters(cluster_ids);
    let (mut big_c, mut big_s) = (0.0, 0.0);

    let mut start = 0;
    while start < times.len() {
        let id = cluster_ids[start];
        let mut end = start;
        let (mut c, mut s) = (0.0, 0.0);
        while end < times.len() && cluster_ids[end] == id {
            let angle = TWO_PI * phase_unchecked(times[end], period);
            c += angle.cos();
            s += angle.sin();
            end += 1;
        }
        // Direction only; the cluster's own concentration is discarded
        let direction = s.atan2(c);
        big_c += direction.cos();
        big_s += direction.sin();
        start = end;
    }

    let d2 = d2_statistic(big_c, big_s, n_cl);
    ClusterRobustTest {
        n_clusters: n_cl,
        d2,
        p_value: p_from_d2(d2),
    }
}

// ============================================================================
// Public tests
// ============================================================================

/// Standard Schuster test over all events.
///
/// Empty input gives `D² = 0`, `p = 1`.
pub fn standard_test(times: &[f64], period_days: f64) -> Result<StandardTest> {
    validate_period(period_days)?;
    ensure_finite(times)?;
    Ok(standard_unchecked(times, period_days))
}

/// Cluster-robust Schuster test.
///
/// # Arguments
/// * `times` - Event times in days, ascending
/// * `period_days` - Candidate period
/// * `gap_days` - Cluster gap threshold
pub fn cluster_robust_test(
    times: &[f64],
    period_days: f64,
    gap_days: f64,
) -> Result<ClusterRobustTest> {
    validate_period(period_days)?;
    let ids = assign_clusters(times, gap_days)?;
    Ok(cluster_robust_unchecked(times, &ids, period_days))
}

/// Both Schuster tests at one period.
pub fn schuster_single_period(times: &[f64], period_days: f64, gap_days: f64) -> Result<SchusterTest> {
    validate_period(period_days)?;
    let ids = assign_clusters(times, gap_days)?;
    if times.is_empty() {
        warn!("schuster test on empty time array, returning D2 = 0, p = 1");
    }
    Ok(SchusterTest {
        period_days,
        standard: standard_unchecked(times, period_days),
        cluster_robust: cluster_robust_unchecked(times, &ids, period_days),
    })
}

/// Default log-spaced grid for the Schuster spectrum (200 periods, 0.25-548 d).
pub fn default_spectrum_grid() -> Result<Vec<f64>> {
    log_spaced_grid(SPECTRUM_N_PERIODS, SPECTRUM_MIN_DAYS, SPECTRUM_MAX_DAYS)
}

/// Standard and cluster-robust tests at every period of a grid.
///
/// Clusters do not depend on the period, so they are assigned once. Periods are
/// evaluated in parallel with the `parallel` feature; output follows grid order.
///
/// # Arguments
/// * `times` - Event times in days, ascending
/// * `period_grid` - Candidate periods (each strictly positive)
/// * `gap_days` - Cluster gap threshold
pub fn schuster_spectrum(
    times: &[f64],
    period_grid: &[f64],
    gap_days: f64,
) -> Result<SchusterSpectrum> {
    for &p in period_grid {
        validate_period(p)?;
    }
    let ids = assign_clusters(times, gap_days)?;
    let n_cl = n_clusters(&ids);

    info!(
        n_events = times.len(),
        n_clusters = n_cl,
        n_periods = period_grid.len(),
        "running schuster spectrum"
    );

    let points: Vec<SpectrumPoint> = iter_maybe_parallel!(0..period_grid.len())
        .map(|i| {
            let period = period_grid[i];
            let std = standard_unchecked(times, period);
            let cr = cluster_robust_unchecked(times, &ids, period);
            SpectrumPoint {
                period_days: period,
                d2_standard: std.d2,
                p_standard: std.p_value,
                d2_cluster_robust: cr.d2,
                p_cluster_robust: cr.p_value,
            }
        })
        .collect();

    let spectrum = SchusterSpectrum {
        n_events: times.len(),
        n_clusters: n_cl,
        gap_days,
        points,
    };
    if let Some(best) = spectrum.most_significant_cluster_robust() {
        debug!(
            period_days = best.period_days,
            p_cluster_robust = best.p_cluster_robust,
            "schuster spectrum minimum"
        );
    }
    Ok(spectrum)
}

/// Schuster tests at each named period.
pub fn schuster_named_tests(
    times: &[f64],
    named: &[NamedPeriod],
    gap_days: f64,
) -> Result<Vec<NamedPeriodTest>> {
    let ids = assign_clusters(times, gap_days)?;
    named
        .iter()
        .map(|np| {
            validate_period(np.period_days)?;
            Ok(NamedPeriodTest {
                name: np.name,
                test: SchusterTest {
                    period_days: np.period_days,
                    standard: standard_unchecked(times, np.period_days),
                    cluster_robust: cluster_robust_unchecked(times, &ids, np.period_days),
                },
            })
        })
        .collect()
}
