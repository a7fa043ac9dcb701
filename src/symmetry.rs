//! Hemisphere symmetry of elevated phase intervals.
//!
//! A forcing tied to solar geometry should raise the same calendar phases in
//! both hemispheres; a seasonal (hydrological) load should shift the northern
//! and southern peaks by half a year. The four tests below compare the
//! elevated intervals recovered separately from each hemisphere at the
//! canonical bin count, and the rule tables map their outcomes to support
//! levels for each hypothesis.
//!
//! The first baseline is treated as the primary interval; the remaining ones
//! are the secondary intervals tested for hemisphere specificity.

use crate::binning::{bin_statistics, BinStats};
use crate::catalog::Catalog;
use crate::circular::circular_distance;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::intervals::{elevated_from_counts, overlap_fraction, BaselineInterval, ElevatedInterval};
use serde::Serialize;
use std::fmt;
use tracing::info;

/// Outcome of the global symmetry test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GlobalSymmetry {
    #[serde(rename = "fully symmetric")]
    FullySymmetric,
    #[serde(rename = "partially symmetric")]
    PartiallySymmetric,
    #[serde(rename = "asymmetric")]
    Asymmetric,
}

/// Which hemispheres recover a baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HemisphereSpecificity {
    Both,
    NhOnly,
    ShOnly,
    Neither,
}

impl HemisphereSpecificity {
    fn from_flags(in_nh: bool, in_sh: bool) -> Self {
        match (in_nh, in_sh) {
            (true, true) => Self::Both,
            (true, false) => Self::NhOnly,
            (false, true) => Self::ShOnly,
            (false, false) => Self::Neither,
        }
    }

    /// Present in exactly one hemisphere.
    pub fn is_specific(&self) -> bool {
        matches!(self, Self::NhOnly | Self::ShOnly)
    }
}

/// Support level of a hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SupportLevel {
    #[serde(rename = "supported")]
    Supported,
    #[serde(rename = "partially supported")]
    PartiallySupported,
    #[serde(rename = "not supported")]
    NotSupported,
}

impl SupportLevel {
    fn score(&self) -> u8 {
        match self {
            Self::Supported => 3,
            Self::PartiallySupported => 2,
            Self::NotSupported => 1,
        }
    }
}

impl fmt::Display for SupportLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Supported => "supported",
            Self::PartiallySupported => "partially supported",
            Self::NotSupported => "not supported",
        })
    }
}

/// Best-supported hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryConclusion {
    Geometric,
    Hydrological,
    Mixed,
    Ambiguous,
}

// ============================================================================
// Test records
// ============================================================================

/// Presence of one baseline in each hemisphere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BaselinePresence {
    pub baseline_id: u32,
    pub in_nh: bool,
    pub in_sh: bool,
    pub symmetric: bool,
}

/// Test 1: every baseline in both hemispheres.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalSymmetryTest {
    pub per_baseline: Vec<BaselinePresence>,
    pub classification: GlobalSymmetry,
}

/// Test 2: primary baseline in both hemispheres, and how far apart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PrimarySymmetryTest {
    pub baseline_id: u32,
    pub in_nh: bool,
    pub in_sh: bool,
    /// NH minus SH mean phase of the best-matching intervals
    pub phase_offset: Option<f64>,
    /// Circular offset within one canonical bin width
    pub offset_within_tolerance: Option<bool>,
}

/// Test 3 entry: specificity of one secondary baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SecondarySpecificity {
    pub baseline_id: u32,
    pub hemisphere: HemisphereSpecificity,
}

/// One NH/SH interval pair checked for a half-cycle offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HalfCyclePair {
    pub nh_center: f64,
    pub expected_sh_counterpart: f64,
    pub sh_center: f64,
    pub offset: f64,
    pub within_tolerance: bool,
}

/// Test 4: NH intervals mirrored half a cycle later in the SH.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HalfCycleTest {
    pub any_found: bool,
    pub pairs: Vec<HalfCyclePair>,
}

/// All four symmetry tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymmetryTests {
    pub global: GlobalSymmetryTest,
    pub primary: Option<PrimarySymmetryTest>,
    pub secondary: Vec<SecondarySpecificity>,
    pub half_cycle: HalfCycleTest,
}

/// Support for each hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionSupport {
    pub geometric: SupportLevel,
    pub hydrological: SupportLevel,
    pub mixed: SupportLevel,
    pub primary_conclusion: PrimaryConclusion,
}

/// Statistics of one hemisphere at one bin count.
#[derive(Debug, Clone, Serialize)]
pub struct HemisphereBinResult {
    pub stats: BinStats,
    pub elevated: Vec<ElevatedInterval>,
}

/// Hemisphere stratification report.
#[derive(Debug, Clone, Serialize)]
pub struct HemisphereReport {
    pub n_north: usize,
    pub n_south: usize,
    pub n_equatorial: usize,
    pub north: Vec<HemisphereBinResult>,
    pub south: Vec<HemisphereBinResult>,
    pub tests: SymmetryTests,
    pub predictions: PredictionSupport,
}

// ============================================================================
// Tests
// ============================================================================

/// True if some elevated interval covers more than `threshold` of the baseline.
pub fn baseline_recovered(
    baseline: &BaselineInterval,
    elevated: &[ElevatedInterval],
    threshold: f64,
) -> bool {
    let b = baseline.interval();
    elevated
        .iter()
        .any(|e| overlap_fraction(&b, &e.interval()) > threshold)
}

/// Mean phase of the elevated interval covering the largest share of the baseline.
fn best_match_center(
    baseline: &BaselineInterval,
    elevated: &[ElevatedInterval],
    threshold: f64,
) -> Option<f64> {
    let b = baseline.interval();
    elevated
        .iter()
        .map(|e| (overlap_fraction(&b, &e.interval()), e.mean_phase))
        .filter(|(frac, _)| *frac > threshold)
        .fold(None, |best: Option<(f64, f64)>, cur| match best {
            Some(b) if b.0 >= cur.0 => Some(b),
            _ => Some(cur),
        })
        .map(|(_, center)| center)
}

/// Test 1.
pub fn global_symmetry(
    nh: &[ElevatedInterval],
    sh: &[ElevatedInterval],
    baselines: &[BaselineInterval],
    threshold: f64,
) -> GlobalSymmetryTest {
    let per_baseline: Vec<BaselinePresence> = baselines
        .iter()
        .map(|b| {
            let in_nh = baseline_recovered(b, nh, threshold);
            let in_sh = baseline_recovered(b, sh, threshold);
            BaselinePresence {
                baseline_id: b.id,
                in_nh,
                in_sh,
                symmetric: in_nh && in_sh,
            }
        })
        .collect();

    let classification = if !per_baseline.is_empty() && per_baseline.iter().all(|p| p.symmetric) {
        GlobalSymmetry::FullySymmetric
    } else if per_baseline.iter().any(|p| p.symmetric) {
        GlobalSymmetry::PartiallySymmetric
    } else {
        GlobalSymmetry::Asymmetric
    };

    GlobalSymmetryTest {
        per_baseline,
        classification,
    }
}

/// Test 2.
pub fn primary_symmetry(
    nh: &[ElevatedInterval],
    sh: &[ElevatedInterval],
    primary: &BaselineInterval,
    threshold: f64,
    tolerance: f64,
) -> PrimarySymmetryTest {
    let in_nh = baseline_recovered(primary, nh, threshold);
    let in_sh = baseline_recovered(primary, sh, threshold);
    let nh_center = best_match_center(primary, nh, threshold);
    let sh_center = best_match_center(primary, sh, threshold);

    let phase_offset = match (nh_center, sh_center) {
        (Some(a), Some(b)) => Some(a - b),
        _ => None,
    };
    let offset_within_tolerance = match (nh_center, sh_center) {
        (Some(a), Some(b)) => Some(circular_distance(a, b) <= tolerance),
        _ => None,
    };

    PrimarySymmetryTest {
        baseline_id: primary.id,
        in_nh,
        in_sh,
        phase_offset,
        offset_within_tolerance,
    }
}

/// Test 3.
pub fn secondary_specificity(
    nh: &[ElevatedInterval],
    sh: &[ElevatedInterval],
    secondaries: &[BaselineInterval],
    threshold: f64,
) -> Vec<SecondarySpecificity> {
    secondaries
        .iter()
        .map(|b| SecondarySpecificity {
            baseline_id: b.id,
            hemisphere: HemisphereSpecificity::from_flags(
                baseline_recovered(b, nh, threshold),
                baseline_recovered(b, sh, threshold),
            ),
        })
        .collect()
}

/// Test 4: for every NH interval, look for an SH interval centred half a cycle later.
pub fn half_cycle_offset(
    nh: &[ElevatedInterval],
    sh: &[ElevatedInterval],
    tolerance: f64,
) -> HalfCycleTest {
    let mut pairs = Vec::with_capacity(nh.len() * sh.len());
    for n in nh {
        let counterpart = (n.mean_phase + 0.5).rem_euclid(1.0);
        for s in sh {
            let offset = circular_distance(s.mean_phase, counterpart);
            pairs.push(HalfCyclePair {
                nh_center: n.mean_phase,
                expected_sh_counterpart: counterpart,
                sh_center: s.mean_phase,
                offset,
                within_tolerance: offset <= tolerance,
            });
        }
    }
    HalfCycleTest {
        any_found: pairs.iter().any(|p| p.within_tolerance),
        pairs,
    }
}

/// Run all four tests on canonical-k elevated intervals.
///
/// `tolerance` is one bin width at the canonical bin count.
pub fn symmetry_tests(
    nh: &[ElevatedInterval],
    sh: &[ElevatedInterval],
    baselines: &[BaselineInterval],
    threshold: f64,
    tolerance: f64,
) -> SymmetryTests {
    let global = global_symmetry(nh, sh, baselines, threshold);
    let primary = baselines
        .first()
        .map(|p| primary_symmetry(nh, sh, p, threshold, tolerance));
    let secondary = secondary_specificity(nh, sh, baselines.get(1..).unwrap_or(&[]), threshold);
    let half_cycle = half_cycle_offset(nh, sh, tolerance);

    SymmetryTests {
        global,
        primary,
        secondary,
        half_cycle,
    }
}

// ============================================================================
// Predictions
// ============================================================================

/// Map symmetry test outcomes to hypothesis support.
pub fn evaluate_predictions(tests: &SymmetryTests) -> PredictionSupport {
    let presence = &tests.global.per_baseline;
    let all_symmetric = !presence.is_empty() && presence.iter().all(|p| p.symmetric);
    let primary_symmetric_t1 = presence.first().is_some_and(|p| p.symmetric);
    let half_cycle = tests.half_cycle.any_found;

    let any_secondary_specific = tests.secondary.iter().any(|s| s.hemisphere.is_specific());
    let all_secondary_specific =
        !tests.secondary.is_empty() && tests.secondary.iter().all(|s| s.hemisphere.is_specific());

    let geometric = if all_symmetric && !half_cycle {
        SupportLevel::Supported
    } else if all_symmetric || (primary_symmetric_t1 && !half_cycle) {
        SupportLevel::PartiallySupported
    } else {
        SupportLevel::NotSupported
    };

    let hydrological = if half_cycle && any_secondary_specific {
        SupportLevel::Supported
    } else if half_cycle || all_secondary_specific {
        SupportLevel::PartiallySupported
    } else {
        SupportLevel::NotSupported
    };

    let primary_symmetric = primary_symmetric_t1
        || tests.primary.as_ref().is_some_and(|p| p.in_nh && p.in_sh);
    let mixed = if primary_symmetric && any_secondary_specific {
        SupportLevel::Supported
    } else if primary_symmetric || any_secondary_specific {
        SupportLevel::PartiallySupported
    } else {
        SupportLevel::NotSupported
    };

    let scored = [
        (PrimaryConclusion::Geometric, geometric.score()),
        (PrimaryConclusion::Hydrological, hydrological.score()),
        (PrimaryConclusion::Mixed, mixed.score()),
    ];
    let top = scored.iter().map(|(_, s)| *s).max().unwrap_or(0);
    let leaders: Vec<PrimaryConclusion> = scored
        .iter()
        .filter(|(_, s)| *s == top)
        .map(|(h, _)| *h)
        .collect();
    let primary_conclusion = match leaders.as_slice() {
        [only] => *only,
        _ => PrimaryConclusion::Ambiguous,
    };

    PredictionSupport {
        geometric,
        hydrological,
        mixed,
        primary_conclusion,
    }
}

// ============================================================================
// Hemisphere stratification
// ============================================================================

fn hemisphere_bins(catalog: &Catalog, config: &AnalysisConfig) -> Result<Vec<HemisphereBinResult>> {
    let phases = catalog.phases();
    config
        .bin_counts
        .iter()
        .map(|&k| {
            let stats = bin_statistics(&phases, k)?;
            let elevated =
                elevated_from_counts(&phases, &stats.counts, &config.baselines, config.overlap_threshold);
            info!(
                hemisphere = catalog.label(),
                k,
                chi2 = stats.chi2,
                p = stats.p_chi2,
                n_intervals = elevated.len(),
                "hemisphere bin statistics"
            );
            Ok(HemisphereBinResult { stats, elevated })
        })
        .collect()
}

/// Split a catalog by hemisphere, compute per-hemisphere statistics at every
/// bin count and run the symmetry tests at the canonical bin count.
pub fn hemisphere_analysis(catalog: &Catalog, config: &AnalysisConfig) -> Result<HemisphereReport> {
    config.validate()?;
    let split = catalog.hemispheres();
    let north = hemisphere_bins(&split.north, config)?;
    let south = hemisphere_bins(&split.south, config)?;

    let canonical = |results: &[HemisphereBinResult]| -> Vec<ElevatedInterval> {
        results
            .iter()
            .find(|r| r.stats.k == config.canonical_k)
            .map(|r| r.elevated.clone())
            .unwrap_or_default()
    };
    let tolerance = 1.0 / config.canonical_k as f64;
    let tests = symmetry_tests(
        &canonical(&north),
        &canonical(&south),
        &config.baselines,
        config.overlap_threshold,
        tolerance,
    );
    let predictions = evaluate_predictions(&tests);

    info!(
        global = ?tests.global.classification,
        half_cycle = tests.half_cycle.any_found,
        geometric = %predictions.geometric,
        hydrological = %predictions.hydrological,
        mixed = %predictions.mixed,
        primary = ?predictions.primary_conclusion,
        "hemisphere symmetry"
    );

    Ok(HemisphereReport {
        n_north: split.north.len(),
        n_south: split.south.len(),
        n_equatorial: split.n_equatorial,
        north,
        south,
        tests,
        predictions,
    })
}
