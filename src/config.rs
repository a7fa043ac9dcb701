//! Analysis configuration.
//!
//! Every top-level analysis takes an explicit [`AnalysisConfig`]. Missing JSON
//! fields fall back to the defaults below.

use crate::binning::{CANONICAL_BIN_COUNT, DEFAULT_BIN_COUNTS};
use crate::error::{Error, Result};
use crate::helpers::log_spaced_grid;
use crate::intervals::{a1b_baseline_intervals, BaselineInterval, DEFAULT_OVERLAP_THRESHOLD};
use crate::schuster::{DEFAULT_CLUSTER_GAP_DAYS, SPECTRUM_MAX_DAYS, SPECTRUM_MIN_DAYS, SPECTRUM_N_PERIODS};
use serde::{Deserialize, Serialize};

pub use crate::mfpa::MfpaParams;

/// Log-spaced period grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub n_periods: usize,
    pub min_period_days: f64,
    pub max_period_days: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            n_periods: SPECTRUM_N_PERIODS,
            min_period_days: SPECTRUM_MIN_DAYS,
            max_period_days: SPECTRUM_MAX_DAYS,
        }
    }
}

impl GridConfig {
    /// Materialise the grid.
    pub fn periods(&self) -> Result<Vec<f64>> {
        log_spaced_grid(self.n_periods, self.min_period_days, self.max_period_days)
    }
}

/// Rolling-window stationarity settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window length in calendar years
    pub window_years: i32,
    /// First window start year of the focus span
    pub focus_start_year: i32,
    /// Last window start year of the focus span
    pub focus_end_year: i32,
    /// Focus-to-rest mean R ratio above which the span is flagged
    pub anomaly_ratio: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_years: 10,
            focus_start_year: 1970,
            focus_end_year: 1979,
            anomaly_ratio: 1.5,
        }
    }
}

/// Settings shared by the analysis entry points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Root seed for every random stream
    pub seed: u64,
    /// Phase-bin counts analysed
    pub bin_counts: Vec<usize>,
    /// Bin count used for survival and cross-stratum comparisons
    pub canonical_k: usize,
    /// Significance level
    pub alpha: f64,
    /// Gap threshold for temporal clusters (days)
    pub cluster_gap_days: f64,
    /// Overlap fraction for baseline matching
    pub overlap_threshold: f64,
    /// Reference phase intervals
    pub baselines: Vec<BaselineInterval>,
    /// Replicates for bootstrap intervals and subsample nulls
    pub n_bootstrap: usize,
    /// Bins nominated per bin count in the consensus set
    pub consensus_top_n: usize,
    /// Bin counts that must agree in the consensus set
    pub consensus_min_votes: usize,
    /// Schuster spectrum grid
    pub schuster_grid: GridConfig,
    /// MFPA scan parameters
    pub mfpa: MfpaParams,
    /// Rolling-window settings
    pub windows: WindowConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            bin_counts: DEFAULT_BIN_COUNTS.to_vec(),
            canonical_k: CANONICAL_BIN_COUNT,
            alpha: 0.05,
            cluster_gap_days: DEFAULT_CLUSTER_GAP_DAYS,
            overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
            baselines: a1b_baseline_intervals(),
            n_bootstrap: 1000,
            consensus_top_n: 3,
            consensus_min_votes: 2,
            schuster_grid: GridConfig::default(),
            mfpa: MfpaParams::default(),
            windows: WindowConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Parse from JSON and validate.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AnalysisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidParameter(msg));

        if self.bin_counts.is_empty() {
            return invalid("at least one bin count is required".into());
        }
        if let Some(&k) = self.bin_counts.iter().find(|&&k| k < 2) {
            return invalid(format!("bin counts must be at least 2, got {k}"));
        }
        if !self.bin_counts.contains(&self.canonical_k) {
            return invalid(format!(
                "canonical bin count {} is not among the analysed bin counts {:?}",
                self.canonical_k, self.bin_counts
            ));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return invalid(format!("alpha must lie in (0, 1), got {}", self.alpha));
        }
        if !(self.cluster_gap_days.is_finite() && self.cluster_gap_days > 0.0) {
            return invalid(format!(
                "cluster gap must be positive, got {}",
                self.cluster_gap_days
            ));
        }
        if !(0.0..1.0).contains(&self.overlap_threshold) {
            return invalid(format!(
                "overlap threshold must lie in [0, 1), got {}",
                self.overlap_threshold
            ));
        }
        for b in &self.baselines {
            if !(0.0 <= b.phase_start && b.phase_start < b.phase_end && b.phase_end <= 1.0) {
                return invalid(format!(
                    "baseline {} has invalid bounds [{}, {})",
                    b.id, b.phase_start, b.phase_end
                ));
            }
        }
        if self.n_bootstrap == 0 {
            return invalid("n_bootstrap must be positive".into());
        }
        if self.consensus_min_votes == 0 || self.consensus_min_votes > self.bin_counts.len() {
            return invalid(format!(
                "consensus_min_votes must be in 1..={}",
                self.bin_counts.len()
            ));
        }
        if self.windows.window_years < 1 {
            return invalid("window length must be at least one year".into());
        }
        self.schuster_grid.periods()?;
        self.mfpa.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bin_counts, vec![16, 24, 32]);
        assert_eq!(config.baselines.len(), 3);
        assert_eq!(config.mfpa.n_periods, 300);
    }

    #[test]
    fn test_from_json_partial_override() {
        let config = AnalysisConfig::from_json_str(
            r#"{ "seed": 7, "mfpa": { "n_bootstrap": 50 }, "windows": { "window_years": 5 } }"#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.mfpa.n_bootstrap, 50);
        assert_eq!(config.mfpa.n_periods, 300);
        assert_eq!(config.windows.window_years, 5);
        assert_eq!(config.canonical_k, 24);
    }

    #[test]
    fn test_from_json_rejects_inconsistent() {
        let err = AnalysisConfig::from_json_str(r#"{ "bin_counts": [16, 32] }"#).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
        assert!(matches!(
            AnalysisConfig::from_json_str("{ not json"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_roundtrip_through_json() {
        let config = AnalysisConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back = AnalysisConfig::from_json_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
