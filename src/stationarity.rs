//! Rolling-window stationarity of the annual phase signal.
//!
//! Windows of `window_years` calendar years start every year from the first
//! catalog year up to `last_year - window_years`. Each window gets a Rayleigh
//! test and a chi-square test at the canonical bin count; the summary asks
//! whether the signal is present in most windows with a stable mean phase.

use crate::binning::{bin_counts, chi_square_uniform};
use crate::catalog::{event_year, Catalog};
use crate::circular::{circular_spread, rayleigh};
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::helpers::mean;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Fraction of significant windows at or above which the signal can be stationary.
pub const STATIONARY_MIN_FRACTION: f64 = 0.70;
/// Circular standard deviation (degrees) below which the mean phase is stable.
pub const STATIONARY_MAX_STD_DEG: f64 = 20.0;
/// Fraction of significant windows below which the signal is non-stationary.
pub const NONSTATIONARY_MAX_FRACTION: f64 = 0.30;
/// Circular standard deviation (degrees) above which the signal is non-stationary.
pub const NONSTATIONARY_MIN_STD_DEG: f64 = 40.0;

/// Stationarity verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stationarity {
    #[serde(rename = "stationary")]
    Stationary,
    #[serde(rename = "partially stationary")]
    PartiallyStationary,
    #[serde(rename = "non-stationary")]
    NonStationary,
}

/// Statistics of one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowResult {
    /// First calendar year
    pub window_start: i32,
    /// Last calendar year (inclusive)
    pub window_end: i32,
    pub n: usize,
    pub rayleigh_r: f64,
    pub rayleigh_z: f64,
    pub p_rayleigh: f64,
    pub mean_phase: f64,
    /// Chi-square at the canonical bin count (0 for an empty window)
    pub chi2: f64,
    /// Chi-square p-value (1 for an empty window)
    pub p_chi2: f64,
    /// Window start lies in the focus span
    pub in_focus: bool,
}

/// Summary across windows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StationaritySummary {
    pub n_windows: usize,
    /// Windows with Rayleigh p below alpha
    pub n_significant: usize,
    pub pct_significant: f64,
    /// Windows with Rayleigh p below alpha / n_windows
    pub n_bonferroni_significant: usize,
    pub bonferroni_threshold: f64,
    /// Circular variance of the window mean phases
    pub circular_variance: f64,
    /// Circular standard deviation of the window mean phases (degrees)
    pub circular_std_deg: f64,
    pub classification: Stationarity,
    pub focus_mean_r: f64,
    pub rest_mean_r: f64,
    /// focus_mean_r / rest_mean_r, 0 when the rest has no signal
    pub focus_ratio: f64,
    pub focus_anomaly: bool,
}

/// Rolling-window report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationarityReport {
    pub windows: Vec<WindowResult>,
    pub summary: StationaritySummary,
}

/// Classify from the fraction of significant windows and the mean-phase spread.
pub fn classify_stationarity(fraction_significant: f64, circular_std_deg: f64) -> Stationarity {
    if fraction_significant >= STATIONARY_MIN_FRACTION && circular_std_deg < STATIONARY_MAX_STD_DEG {
        Stationarity::Stationary
    } else if fraction_significant < NONSTATIONARY_MAX_FRACTION
        || circular_std_deg > NONSTATIONARY_MIN_STD_DEG
    {
        Stationarity::NonStationary
    } else {
        Stationarity::PartiallyStationary
    }
}

fn window_result(phases: &[f64], start: i32, end: i32, k: usize, in_focus: bool) -> Result<WindowResult> {
    let ray = rayleigh(phases);
    let (chi2, p_chi2) = if phases.is_empty() {
        warn!(window_start = start, "empty window");
        (0.0, 1.0)
    } else {
        let test = chi_square_uniform(&bin_counts(phases, k)?)?;
        (test.chi2, test.p_value)
    };
    debug!(start, end, n = phases.len(), r = ray.r, p = ray.p_value, "window");

    Ok(WindowResult {
        window_start: start,
        window_end: end,
        n: phases.len(),
        rayleigh_r: ray.r,
        rayleigh_z: ray.z,
        p_rayleigh: ray.p_value,
        mean_phase: ray.mean_phase,
        chi2,
        p_chi2,
        in_focus,
    })
}

/// Summarise per-window results.
///
/// # Errors
/// `EmptyInput` when there are no windows.
pub fn summarize_windows(
    windows: &[WindowResult],
    alpha: f64,
    anomaly_ratio: f64,
) -> Result<StationaritySummary> {
    if windows.is_empty() {
        return Err(Error::EmptyInput("stationarity summary needs at least one window"));
    }
    let n_windows = windows.len();
    let bonferroni_threshold = alpha / n_windows as f64;
    let n_significant = windows.iter().filter(|w| w.p_rayleigh < alpha).count();
    let n_bonferroni_significant = windows
        .iter()
        .filter(|w| w.p_rayleigh < bonferroni_threshold)
        .count();
    let fraction = n_significant as f64 / n_windows as f64;

    let mean_phases: Vec<f64> = windows.iter().map(|w| w.mean_phase).collect();
    let (circular_variance, circular_std_deg) = circular_spread(&mean_phases);
    let classification = classify_stationarity(fraction, circular_std_deg);

    let focus: Vec<f64> = windows.iter().filter(|w| w.in_focus).map(|w| w.rayleigh_r).collect();
    let rest: Vec<f64> = windows.iter().filter(|w| !w.in_focus).map(|w| w.rayleigh_r).collect();
    let focus_mean_r = mean(&focus);
    let rest_mean_r = mean(&rest);
    let focus_ratio = if rest_mean_r > 0.0 {
        focus_mean_r / rest_mean_r
    } else {
        0.0
    };

    Ok(StationaritySummary {
        n_windows,
        n_significant,
        pct_significant: fraction * 100.0,
        n_bonferroni_significant,
        bonferroni_threshold,
        circular_variance,
        circular_std_deg,
        classification,
        focus_mean_r,
        rest_mean_r,
        focus_ratio,
        focus_anomaly: focus_ratio > anomaly_ratio,
    })
}

/// Rolling-window stationarity analysis.
///
/// # Arguments
/// * `catalog` - Events with times in days since `epoch`
/// * `epoch` - Epoch of the catalog time axis, used to derive calendar years
/// * `config` - Window settings, canonical bin count and alpha
///
/// # Errors
/// `EmptyInput` for an empty catalog or one spanning fewer years than a window.
pub fn rolling_window_stationarity(
    catalog: &Catalog,
    epoch: DateTime<Utc>,
    config: &AnalysisConfig,
) -> Result<StationarityReport> {
    config.validate()?;
    let w = &config.windows;
    let years = catalog
        .events()
        .iter()
        .map(|e| event_year(e.time_days, epoch))
        .collect::<Result<Vec<i32>>>()?;
    let (Some(&first), Some(&last)) = (years.iter().min(), years.iter().max()) else {
        return Err(Error::EmptyInput("stationarity needs at least one event"));
    };

    let all_phases = catalog.phases();
    let windows = (first..=last - w.window_years)
        .map(|start| {
            let phases: Vec<f64> = years
                .iter()
                .zip(&all_phases)
                .filter(|&(&y, _)| y >= start && y < start + w.window_years)
                .map(|(_, &p)| p)
                .collect();
            let in_focus = (w.focus_start_year..=w.focus_end_year).contains(&start);
            window_result(&phases, start, start + w.window_years - 1, config.canonical_k, in_focus)
        })
        .collect::<Result<Vec<_>>>()?;

    let summary = summarize_windows(&windows, config.alpha, w.anomaly_ratio)?;
    info!(
        n_windows = summary.n_windows,
        n_significant = summary.n_significant,
        circ_std_deg = summary.circular_std_deg,
        classification = ?summary.classification,
        focus_ratio = summary.focus_ratio,
        "rolling-window stationarity"
    );

    Ok(StationarityReport { windows, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{reference_epoch, Event};
    use crate::helpers::JULIAN_YEAR_DAYS;

    fn window(start: i32, r: f64, p: f64, mean_phase: f64, in_focus: bool) -> WindowResult {
        WindowResult {
            window_start: start,
            window_end: start + 9,
            n: 100,
            rayleigh_r: r,
            rayleigh_z: 100.0 * r * r,
            p_rayleigh: p,
            mean_phase,
            chi2: 0.0,
            p_chi2: 1.0,
            in_focus,
        }
    }

    #[test]
    fn test_classify_stationarity() {
        assert_eq!(classify_stationarity(0.8, 10.0), Stationarity::Stationary);
        assert_eq!(classify_stationarity(0.8, 30.0), Stationarity::PartiallyStationary);
        assert_eq!(classify_stationarity(0.2, 10.0), Stationarity::NonStationary);
        assert_eq!(classify_stationarity(0.5, 45.0), Stationarity::NonStationary);
        assert_eq!(
            serde_json::to_string(&Stationarity::NonStationary).unwrap(),
            "\"non-stationary\""
        );
    }

    #[test]
    fn test_summarize_windows_focus_ratio() {
        let windows = vec![
            window(1960, 0.1, 0.01, 0.2, false),
            window(1970, 0.3, 0.001, 0.21, true),
            window(1980, 0.1, 0.2, 0.19, false),
        ];
        let s = summarize_windows(&windows, 0.05, 1.5).unwrap();
        assert_eq!(s.n_windows, 3);
        assert_eq!(s.n_significant, 2);
        assert!((s.bonferroni_threshold - 0.05 / 3.0).abs() < 1e-15);
        assert_eq!(s.n_bonferroni_significant, 2);
        assert!((s.focus_ratio - 3.0).abs() < 1e-12);
        assert!(s.focus_anomaly);
        assert!(s.circular_std_deg < 10.0);
        assert!(summarize_windows(&[], 0.05, 1.5).is_err());
    }

    #[test]
    fn test_zero_rest_gives_zero_ratio() {
        let windows = vec![window(1970, 0.3, 0.01, 0.2, true), window(1980, 0.0, 1.0, 0.0, false)];
        let s = summarize_windows(&windows, 0.05, 1.5).unwrap();
        assert_eq!(s.focus_ratio, 0.0);
        assert!(!s.focus_anomaly);
    }

    #[test]
    fn test_rolling_windows_stationary_signal() {
        // 1950-1979, 40 events per year clustered near phase 0.2
        let mut events = Vec::new();
        for year in 0..30 {
            for i in 0..40 {
                let t = year as f64 * JULIAN_YEAR_DAYS + 10.0 + i as f64 * 0.1;
                let phase = 0.2 + 0.002 * (i % 10) as f64;
                events.push(Event::new(t, phase, 6.2, 10.0, 0.0));
            }
        }
        let catalog = Catalog::new("raw", events).unwrap();
        let config = AnalysisConfig::default();

        let report = rolling_window_stationarity(&catalog, reference_epoch(), &config).unwrap();
        // Starts 1950..=1969
        assert_eq!(report.windows.len(), 20);
        assert_eq!(report.windows[0].window_start, 1950);
        assert_eq!(report.windows[0].window_end, 1959);
        assert_eq!(report.windows[0].n, 400);
        assert!(report.windows.iter().all(|w| w.p_rayleigh < 1e-10));
        assert_eq!(report.summary.classification, Stationarity::Stationary);
        assert!(report.windows.iter().filter(|w| w.in_focus).all(|w| w.window_start >= 1970));
    }

    #[test]
    fn test_rolling_windows_too_short() {
        let events = vec![Event::new(0.0, 0.1, 6.0, 1.0, 0.0), Event::new(100.0, 0.4, 6.0, 1.0, 0.0)];
        let catalog = Catalog::new("raw", events).unwrap();
        let err = rolling_window_stationarity(&catalog, reference_epoch(), &AnalysisConfig::default());
        assert!(matches!(err, Err(Error::EmptyInput(_))));
    }
}
