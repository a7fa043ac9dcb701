//! Magnitude stratification of the phase signal.
//!
//! The catalog is split into magnitude bands, each band gets the full bin
//! statistics, and the canonical-k effect sizes are tested for a monotone
//! trend across bands with Spearman's rank correlation.

use crate::binning::{bin_statistics, bootstrap_cramers_v_ci, BinStats, CramerVInterval};
use crate::catalog::Catalog;
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::resampling::replicate_seed;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::{info, warn};

/// Upper magnitude bound of the open-ended top band.
pub const OPEN_BAND_MAX: f64 = 99.0;

/// Spearman rho above which a trend counts as increasing (and below whose negative, decreasing).
pub const TREND_RHO_THRESHOLD: f64 = 0.5;

/// Magnitude band `[min_magnitude, max_magnitude)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagnitudeBand {
    pub label: String,
    pub min_magnitude: f64,
    pub max_magnitude: f64,
}

impl MagnitudeBand {
    pub fn new(label: impl Into<String>, min_magnitude: f64, max_magnitude: f64) -> Self {
        Self {
            label: label.into(),
            min_magnitude,
            max_magnitude,
        }
    }
}

/// M6.0-6.4, M6.5-6.9, M7.0-7.4 and M7.5+.
pub fn default_magnitude_bands() -> Vec<MagnitudeBand> {
    vec![
        MagnitudeBand::new("M6.0-6.4", 6.0, 6.5),
        MagnitudeBand::new("M6.5-6.9", 6.5, 7.0),
        MagnitudeBand::new("M7.0-7.4", 7.0, 7.5),
        MagnitudeBand::new("M7.5+", 7.5, OPEN_BAND_MAX),
    ]
}

/// Spearman rank correlation with its two-sided p-value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpearmanTest {
    pub rho: f64,
    pub p_value: f64,
}

/// Direction of an effect size across ascending magnitude bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Flat,
}

impl Trend {
    pub fn from_rho(rho: f64) -> Self {
        if rho > TREND_RHO_THRESHOLD {
            Trend::Increasing
        } else if rho < -TREND_RHO_THRESHOLD {
            Trend::Decreasing
        } else {
            Trend::Flat
        }
    }
}

/// Support level of a magnitude-dependence prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MagnitudeSupport {
    #[serde(rename = "supported")]
    Supported,
    #[serde(rename = "partially")]
    Partially,
    #[serde(rename = "not supported")]
    NotSupported,
}

/// Support for each magnitude-dependence prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MagnitudePredictions {
    /// Signal weakens with magnitude and vanishes in the top band
    pub hydrological_loading: MagnitudeSupport,
    /// Signal flat or rising with magnitude, present in the top band
    pub solar_geometric: MagnitudeSupport,
    /// Strongest signal in the lowest band
    pub tidal_literature: MagnitudeSupport,
    /// Effect sizes within a factor 1.5 of each other
    pub magnitude_independent: MagnitudeSupport,
}

/// Statistics of one magnitude band.
#[derive(Debug, Clone, Serialize)]
pub struct BandStats {
    pub band: MagnitudeBand,
    pub n: usize,
    /// Bin statistics per configured bin count (empty for an empty band)
    pub per_k: Vec<BinStats>,
    /// Bootstrap interval of Cramér's V at the canonical bin count
    pub cramer_v_ci: Option<CramerVInterval>,
}

impl BandStats {
    fn canonical(&self, k: usize) -> Option<&BinStats> {
        self.per_k.iter().find(|s| s.k == k)
    }
}

/// Cross-band trend analysis at the canonical bin count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendAnalysis {
    pub cramer_v_by_band: Vec<f64>,
    pub rayleigh_r_by_band: Vec<f64>,
    pub spearman_cramer_v: SpearmanTest,
    pub spearman_rayleigh: SpearmanTest,
    /// Trend of Cramér's V
    pub trend: Trend,
    /// Labels of bands whose chi-square p-value is below alpha
    pub significant_bands: Vec<String>,
    pub top_band_significant: bool,
    /// max V / min V (infinite when some band has V = 0)
    pub cramer_v_ratio: f64,
    pub predictions: MagnitudePredictions,
}

/// Magnitude stratification report.
#[derive(Debug, Clone, Serialize)]
pub struct MagnitudeReport {
    pub bands: Vec<BandStats>,
    pub trend: TrendAnalysis,
}

// ============================================================================
// Rank correlation
// ============================================================================

/// Ranks starting at 1, ties receiving the average of their positions.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = rank;
        }
        i = j + 1;
    }
    ranks
}

fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len() as f64;
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx) * (a - mx);
        syy += (b - my) * (b - my);
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Spearman's rho with a Student-t approximation of the two-sided p-value.
///
/// Constant input gives `rho = 0, p = 1`; fewer than three pairs give `p = 1`.
///
/// # Errors
/// `InvalidParameter` if the slices differ in length.
pub fn spearman(x: &[f64], y: &[f64]) -> Result<SpearmanTest> {
    if x.len() != y.len() {
        return Err(Error::InvalidParameter(format!(
            "spearman needs paired samples, got {} and {}",
            x.len(),
            y.len()
        )));
    }
    let n = x.len();
    if n < 2 {
        return Ok(SpearmanTest { rho: 0.0, p_value: 1.0 });
    }
    let Some(rho) = pearson(&average_ranks(x), &average_ranks(y)) else {
        return Ok(SpearmanTest { rho: 0.0, p_value: 1.0 });
    };
    if n < 3 {
        return Ok(SpearmanTest { rho, p_value: 1.0 });
    }
    if 1.0 - rho.abs() <= f64::EPSILON {
        return Ok(SpearmanTest { rho, p_value: 0.0 });
    }

    let dof = (n - 2) as f64;
    let t = rho * (dof / (1.0 - rho * rho)).sqrt();
    let dist = StudentsT::new(0.0, 1.0, dof)
        .map_err(|e| Error::InvalidParameter(format!("student t: {e}")))?;
    let p_value = (2.0 * dist.sf(t.abs())).min(1.0);
    Ok(SpearmanTest { rho, p_value })
}

// ============================================================================
// Predictions
// ============================================================================

fn level(full: bool, partial: bool) -> MagnitudeSupport {
    if full {
        MagnitudeSupport::Supported
    } else if partial {
        MagnitudeSupport::Partially
    } else {
        MagnitudeSupport::NotSupported
    }
}

/// Evaluate the magnitude predictions from per-band effect sizes (ascending magnitude).
pub fn evaluate_magnitude_predictions(
    cramer_v_by_band: &[f64],
    trend: Trend,
    top_band_significant: bool,
) -> (MagnitudePredictions, f64) {
    let decreasing = trend == Trend::Decreasing;
    let flat_or_up = matches!(trend, Trend::Flat | Trend::Increasing);

    let first = cramer_v_by_band.first().copied().unwrap_or(0.0);
    let last = cramer_v_by_band.last().copied().unwrap_or(0.0);
    let v_max = cramer_v_by_band.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let v_min = cramer_v_by_band.iter().copied().fold(f64::INFINITY, f64::min);
    // First maximal band wins ties
    let first_is_max = cramer_v_by_band.iter().all(|&v| v <= first);

    let ratio = if v_min > 0.0 { v_max / v_min } else { f64::INFINITY };

    let predictions = MagnitudePredictions {
        hydrological_loading: level(!top_band_significant && decreasing, !top_band_significant || decreasing),
        solar_geometric: level(flat_or_up && top_band_significant, flat_or_up || top_band_significant),
        tidal_literature: level(first_is_max, first > last),
        magnitude_independent: level(ratio < 1.5, ratio < 2.0),
    };
    (predictions, ratio)
}

// ============================================================================
// Entry point
// ============================================================================

fn band_stats(
    catalog: &Catalog,
    band: &MagnitudeBand,
    band_index: usize,
    config: &AnalysisConfig,
) -> Result<BandStats> {
    let subset = catalog.magnitude_band(band.label.clone(), band.min_magnitude, band.max_magnitude);
    let phases = subset.phases();
    if phases.is_empty() {
        warn!(band = %band.label, "empty magnitude band");
        return Ok(BandStats {
            band: band.clone(),
            n: 0,
            per_k: Vec::new(),
            cramer_v_ci: None,
        });
    }

    let per_k = config
        .bin_counts
        .iter()
        .map(|&k| bin_statistics(&phases, k))
        .collect::<Result<Vec<_>>>()?;
    let ci = bootstrap_cramers_v_ci(
        &phases,
        config.canonical_k,
        config.n_bootstrap,
        replicate_seed(config.seed, band_index as u64),
    )?;

    info!(
        band = %band.label,
        n = phases.len(),
        ci_lower = ci.lower,
        ci_upper = ci.upper,
        "magnitude band"
    );

    Ok(BandStats {
        band: band.clone(),
        n: phases.len(),
        per_k,
        cramer_v_ci: Some(ci),
    })
}

/// Per-band statistics and the cross-band trend analysis.
///
/// # Arguments
/// * `catalog` - Full catalog
/// * `bands` - Magnitude bands in ascending order (at least two)
/// * `config` - Bin counts, canonical k, alpha, bootstrap size and seed
pub fn magnitude_stratification(
    catalog: &Catalog,
    bands: &[MagnitudeBand],
    config: &AnalysisConfig,
) -> Result<MagnitudeReport> {
    config.validate()?;
    if bands.len() < 2 {
        return Err(Error::InvalidParameter(format!(
            "magnitude stratification needs at least two bands, got {}",
            bands.len()
        )));
    }

    let stats = bands
        .iter()
        .enumerate()
        .map(|(i, band)| band_stats(catalog, band, i, config))
        .collect::<Result<Vec<_>>>()?;

    let k = config.canonical_k;
    let cramer_v_by_band: Vec<f64> = stats
        .iter()
        .map(|b| b.canonical(k).map_or(0.0, |s| s.cramer_v))
        .collect();
    let rayleigh_r_by_band: Vec<f64> = stats
        .iter()
        .map(|b| b.canonical(k).map_or(0.0, |s| s.rayleigh_r))
        .collect();
    let band_index: Vec<f64> = (1..=bands.len()).map(|i| i as f64).collect();

    let spearman_cramer_v = spearman(&band_index, &cramer_v_by_band)?;
    let spearman_rayleigh = spearman(&band_index, &rayleigh_r_by_band)?;
    let trend = Trend::from_rho(spearman_cramer_v.rho);

    let significant_bands: Vec<String> = stats
        .iter()
        .filter(|b| b.canonical(k).is_some_and(|s| s.p_chi2 < config.alpha))
        .map(|b| b.band.label.clone())
        .collect();
    let top_band_significant = stats
        .last()
        .and_then(|b| b.canonical(k))
        .is_some_and(|s| s.p_chi2 < config.alpha);

    let (predictions, cramer_v_ratio) =
        evaluate_magnitude_predictions(&cramer_v_by_band, trend, top_band_significant);

    info!(
        rho_v = spearman_cramer_v.rho,
        p_v = spearman_cramer_v.p_value,
        ?trend,
        top_band_significant,
        cramer_v_ratio,
        "magnitude trend"
    );

    Ok(MagnitudeReport {
        bands: stats,
        trend: TrendAnalysis {
            cramer_v_by_band,
            rayleigh_r_by_band,
            spearman_cramer_v,
            spearman_rayleigh,
            trend,
            significant_bands,
            top_band_significant,
            cramer_v_ratio,
            predictions,
        },
    })
}
