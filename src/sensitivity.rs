//! Declustering sensitivity: how much of the raw-catalog signal survives when
//! aftershocks are removed, and whether the aftershocks carry a preference of
//! their own.
//!
//! * Sub-analysis A compares bin statistics of the raw and declustered catalogs
//!   and reports chi-square suppression.
//! * Sub-analysis B recovers elevated intervals from each mainshock catalog and
//!   checks which baselines survive at the canonical bin count.
//! * Sub-analysis C classifies the phase preference of each aftershock catalog.

use crate::binning::{bin_statistics, BinStats};
use crate::catalog::Catalog;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::intervals::{
    elevated_from_counts, find_elevated_intervals, overlap_fraction, BaselineInterval,
    ElevatedInterval, PhaseInterval,
};
use serde::{Serialize, Serializer};
use std::fmt;
use tracing::info;

/// Mainshock and aftershock catalogs produced by one declustering method.
#[derive(Debug, Clone)]
pub struct DeclusteredCatalogs {
    /// Method identifier (e.g. "gk", "reas")
    pub method: String,
    /// Retained mainshocks
    pub mainshocks: Catalog,
    /// Removed aftershocks
    pub aftershocks: Catalog,
}

/// Percentage of chi-square removed by declustering.
///
/// `(chi2_raw - chi2_method) / chi2_raw * 100`, or 0 when `chi2_raw` is 0.
pub fn suppression_pct(chi2_raw: f64, chi2_method: f64) -> f64 {
    if chi2_raw > 0.0 {
        (chi2_raw - chi2_method) / chi2_raw * 100.0
    } else {
        0.0
    }
}

// ============================================================================
// Result records
// ============================================================================

/// Bin statistics of one catalog at every bin count.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogBinStats {
    pub catalog: String,
    pub per_k: Vec<BinStats>,
}

/// Chi-square suppression at one bin count.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SuppressionEntry {
    pub k: usize,
    pub chi2_raw: f64,
    pub chi2_mainshock: f64,
    pub suppression_pct: f64,
}

/// Suppression of one declustering method across bin counts.
#[derive(Debug, Clone, Serialize)]
pub struct MethodSuppression {
    pub method: String,
    pub per_k: Vec<SuppressionEntry>,
}

/// Sub-analysis A: scalar signal survival.
#[derive(Debug, Clone, Serialize)]
pub struct ScalarSurvival {
    pub raw: CatalogBinStats,
    pub mainshocks: Vec<CatalogBinStats>,
    pub suppression: Vec<MethodSuppression>,
}

/// Whether one baseline is recovered from a catalog.
#[derive(Debug, Clone, Serialize)]
pub struct BaselineSurvival {
    /// Baseline identifier
    pub baseline_id: u32,
    /// True if some recovered interval matches the baseline
    pub survives: bool,
    /// Recovered intervals that match it
    pub matching: Vec<ElevatedInterval>,
}

/// Survival status label used in summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurvivalStatus {
    Survives,
    Absent,
}

impl fmt::Display for SurvivalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SurvivalStatus::Survives => "survives",
            SurvivalStatus::Absent => "absent",
        })
    }
}

impl Serialize for SurvivalStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Recovered intervals of one mainshock catalog at one bin count.
#[derive(Debug, Clone, Serialize)]
pub struct RecoveredIntervals {
    pub method: String,
    pub k: usize,
    pub intervals: Vec<ElevatedInterval>,
    pub survival: Vec<BaselineSurvival>,
}

/// Survival status of one method in the canonical-k summary.
#[derive(Debug, Clone, Serialize)]
pub struct MethodStatus {
    pub method: String,
    pub status: SurvivalStatus,
}

/// Canonical-k survival of one baseline across methods.
#[derive(Debug, Clone, Serialize)]
pub struct SurvivalSummary {
    pub baseline_id: u32,
    pub methods: Vec<MethodStatus>,
}

/// Sub-analysis B: interval structure after declustering.
#[derive(Debug, Clone, Serialize)]
pub struct IntervalStructure {
    pub recovered: Vec<RecoveredIntervals>,
    pub survival_summary: Vec<SurvivalSummary>,
}

/// Phase preference of an aftershock catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AftershockPreference {
    /// No bin count reaches significance
    NoPreference,
    /// Elevated intervals overlap a baseline
    MatchesBaseline,
    /// Elevated intervals overlap the mainshock intervals
    SameAsMainshocks,
    /// Significant but elsewhere
    DifferentFromMainshocks,
}

impl fmt::Display for AftershockPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AftershockPreference::NoPreference => "no preference",
            AftershockPreference::MatchesBaseline => "significant, intervals match A1b baseline",
            AftershockPreference::SameAsMainshocks => "same intervals as mainshocks",
            AftershockPreference::DifferentFromMainshocks => "different intervals from mainshocks",
        })
    }
}

impl Serialize for AftershockPreference {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Aftershock statistics at one bin count.
#[derive(Debug, Clone, Serialize)]
pub struct AftershockBinResult {
    pub stats: BinStats,
    /// Elevated intervals, only computed when the chi-square test is significant
    pub elevated: Vec<ElevatedInterval>,
}

/// Sub-analysis C result for one method.
#[derive(Debug, Clone, Serialize)]
pub struct AftershockAnalysis {
    pub method: String,
    pub n: usize,
    pub per_k: Vec<AftershockBinResult>,
    pub preference: AftershockPreference,
}

/// Full declustering sensitivity report.
#[derive(Debug, Clone, Serialize)]
pub struct DeclusteringSensitivity {
    pub scalar_survival: ScalarSurvival,
    pub interval_structure: IntervalStructure,
    pub aftershock_preference: Vec<AftershockAnalysis>,
}

// ============================================================================
// Survival and preference
// ============================================================================

/// Per-baseline survival given recovered intervals.
///
/// A baseline survives iff some recovered interval is classified as matching it.
pub fn interval_survival(
    recovered: &[ElevatedInterval],
    baselines: &[BaselineInterval],
) -> Vec<BaselineSurvival> {
    baselines
        .iter()
        .map(|b| {
            let matching: Vec<ElevatedInterval> = recovered
                .iter()
                .filter(|iv| iv.classification.matched_id() == Some(b.id))
                .cloned()
                .collect();
            BaselineSurvival {
                baseline_id: b.id,
                survives: !matching.is_empty(),
                matching,
            }
        })
        .collect()
}

fn any_overlap(a: &[PhaseInterval], b: &[PhaseInterval], threshold: f64) -> bool {
    a.iter()
        .any(|x| b.iter().any(|y| overlap_fraction(x, y) > threshold))
}

/// Classify aftershock phase preference.
///
/// # Arguments
/// * `aftershock` - Elevated aftershock intervals at the canonical bin count
/// * `mainshock` - Recovered mainshock intervals at the canonical bin count
/// * `p_values` - Aftershock chi-square p-values at every bin count
/// * `baselines` - Reference intervals
/// * `alpha` - Significance level
/// * `threshold` - Overlap fraction threshold
pub fn classify_aftershock_preference(
    aftershock: &[PhaseInterval],
    mainshock: &[PhaseInterval],
    p_values: &[f64],
    baselines: &[BaselineInterval],
    alpha: f64,
    threshold: f64,
) -> AftershockPreference {
    if !p_values.iter().any(|&p| p < alpha) {
        return AftershockPreference::NoPreference;
    }
    let baseline_intervals: Vec<PhaseInterval> = baselines.iter().map(|b| b.interval()).collect();
    if any_overlap(aftershock, &baseline_intervals, threshold) {
        AftershockPreference::MatchesBaseline
    } else if any_overlap(aftershock, mainshock, threshold) {
        AftershockPreference::SameAsMainshocks
    } else {
        AftershockPreference::DifferentFromMainshocks
    }
}

// ============================================================================
// Sub-analyses
// ============================================================================

fn catalog_bin_stats(catalog: &Catalog, bin_counts: &[usize]) -> Result<CatalogBinStats> {
    let phases = catalog.phases();
    let per_k = bin_counts
        .iter()
        .map(|&k| bin_statistics(&phases, k))
        .collect::<Result<Vec<_>>>()?;
    for s in &per_k {
        info!(
            catalog = catalog.label(),
            k = s.k,
            n = s.n,
            chi2 = s.chi2,
            p = s.p_chi2,
            cramer_v = s.cramer_v,
            "bin statistics"
        );
    }
    Ok(CatalogBinStats {
        catalog: catalog.label().to_string(),
        per_k,
    })
}

/// Sub-analysis A.
pub fn scalar_survival(
    raw: &Catalog,
    methods: &[DeclusteredCatalogs],
    config: &AnalysisConfig,
) -> Result<ScalarSurvival> {
    let raw_stats = catalog_bin_stats(raw, &config.bin_counts)?;
    let mainshocks = methods
        .iter()
        .map(|m| catalog_bin_stats(&m.mainshocks, &config.bin_counts))
        .collect::<Result<Vec<_>>>()?;

    let suppression = methods
        .iter()
        .zip(&mainshocks)
        .map(|(m, ms)| MethodSuppression {
            method: m.method.clone(),
            per_k: raw_stats
                .per_k
                .iter()
                .zip(&ms.per_k)
                .map(|(r, s)| SuppressionEntry {
                    k: r.k,
                    chi2_raw: r.chi2,
                    chi2_mainshock: s.chi2,
                    suppression_pct: suppression_pct(r.chi2, s.chi2),
                })
                .collect(),
        })
        .collect();

    Ok(ScalarSurvival {
        raw: raw_stats,
        mainshocks,
        suppression,
    })
}

/// Sub-analysis B.
pub fn interval_structure(
    methods: &[DeclusteredCatalogs],
    config: &AnalysisConfig,
) -> Result<IntervalStructure> {
    let mut recovered = Vec::new();
    for m in methods {
        let phases = m.mainshocks.phases();
        for &k in &config.bin_counts {
            let intervals =
                find_elevated_intervals(&phases, k, &config.baselines, config.overlap_threshold)?;
            let survival = interval_survival(&intervals, &config.baselines);
            info!(
                method = m.method.as_str(),
                k,
                n_intervals = intervals.len(),
                "recovered mainshock intervals"
            );
            recovered.push(RecoveredIntervals {
                method: m.method.clone(),
                k,
                intervals,
                survival,
            });
        }
    }

    let survival_summary = config
        .baselines
        .iter()
        .map(|b| SurvivalSummary {
            baseline_id: b.id,
            methods: methods
                .iter()
                .map(|m| {
                    let survives = recovered
                        .iter()
                        .filter(|r| r.method == m.method && r.k == config.canonical_k)
                        .flat_map(|r| &r.survival)
                        .any(|s| s.baseline_id == b.id && s.survives);
                    MethodStatus {
                        method: m.method.clone(),
                        status: if survives {
                            SurvivalStatus::Survives
                        } else {
                            SurvivalStatus::Absent
                        },
                    }
                })
                .collect(),
        })
        .collect();

    Ok(IntervalStructure {
        recovered,
        survival_summary,
    })
}

/// Sub-analysis C, using the mainshock intervals recovered in sub-analysis B.
pub fn aftershock_preference(
    methods: &[DeclusteredCatalogs],
    structure: &IntervalStructure,
    config: &AnalysisConfig,
) -> Result<Vec<AftershockAnalysis>> {
    methods
        .iter()
        .map(|m| {
            let phases = m.aftershocks.phases();
            let mut per_k = Vec::with_capacity(config.bin_counts.len());
            for &k in &config.bin_counts {
                let stats = bin_statistics(&phases, k)?;
                let elevated = if stats.p_chi2 < config.alpha {
                    elevated_from_counts(
                        &phases,
                        &stats.counts,
                        &config.baselines,
                        config.overlap_threshold,
                    )
                } else {
                    Vec::new()
                };
                per_k.push(AftershockBinResult { stats, elevated });
            }

            let p_values: Vec<f64> = per_k.iter().map(|r| r.stats.p_chi2).collect();
            let aftershock_canonical: Vec<PhaseInterval> = per_k
                .iter()
                .filter(|r| r.stats.k == config.canonical_k)
                .flat_map(|r| r.elevated.iter().map(ElevatedInterval::interval))
                .collect();
            let mainshock_canonical: Vec<PhaseInterval> = structure
                .recovered
                .iter()
                .filter(|r| r.method == m.method && r.k == config.canonical_k)
                .flat_map(|r| r.intervals.iter().map(ElevatedInterval::interval))
                .collect();

            let preference = classify_aftershock_preference(
                &aftershock_canonical,
                &mainshock_canonical,
                &p_values,
                &config.baselines,
                config.alpha,
                config.overlap_threshold,
            );
            info!(method = m.method.as_str(), %preference, "aftershock preference");

            Ok(AftershockAnalysis {
                method: m.method.clone(),
                n: phases.len(),
                per_k,
                preference,
            })
        })
        .collect()
}

/// Run sub-analyses A, B and C.
pub fn declustering_sensitivity(
    raw: &Catalog,
    methods: &[DeclusteredCatalogs],
    config: &AnalysisConfig,
) -> Result<DeclusteringSensitivity> {
    config.validate()?;
    info!(
        raw = raw.len(),
        n_methods = methods.len(),
        "declustering sensitivity"
    );
    let scalar = scalar_survival(raw, methods, config)?;
    let structure = interval_structure(methods, config)?;
    let aftershocks = aftershock_preference(methods, &structure, config)?;
    Ok(DeclusteringSensitivity {
        scalar_survival: scalar,
        interval_structure: structure,
        aftershock_preference: aftershocks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Event;
    use crate::intervals::{a1b_baseline_intervals, IntervalClass};

    fn catalog_from_phases(label: &str, phases: &[f64]) -> Catalog {
        let events = phases
            .iter()
            .enumerate()
            .map(|(i, &p)| Event::new(i as f64 * 3.0, p, 6.2, 10.0, 20.0))
            .collect();
        Catalog::new(label, events).unwrap()
    }

    fn uniform_phases(k: usize, per_bin: usize) -> Vec<f64> {
        (0..k)
            .flat_map(|b| std::iter::repeat((b as f64 + 0.5) / k as f64).take(per_bin))
            .collect()
    }

    fn with_peak(mut phases: Vec<f64>, at: f64, extra: usize) -> Vec<f64> {
        phases.extend(std::iter::repeat(at).take(extra));
        phases
    }

    #[test]
    fn test_suppression_pct() {
        assert!((suppression_pct(100.0, 25.0) - 75.0).abs() < 1e-12);
        assert_eq!(suppression_pct(0.0, 5.0), 0.0);
        assert!(suppression_pct(10.0, 20.0) < 0.0);
    }

    fn elevated(start: f64, end: f64, class: IntervalClass) -> ElevatedInterval {
        ElevatedInterval {
            phase_start: start,
            phase_end: end,
            mean_phase: 0.5 * (start + end),
            start_bin: 0,
            end_bin: 1,
            classification: class,
            n_events: 10,
            r_coherence: 0.9,
        }
    }

    #[test]
    fn test_interval_survival() {
        let recovered = vec![
            elevated(0.1875, 0.25, IntervalClass::Matches(1)),
            elevated(0.4, 0.45, IntervalClass::New),
        ];
        let survival = interval_survival(&recovered, &a1b_baseline_intervals());
        assert_eq!(survival.len(), 3);
        assert!(survival[0].survives);
        assert_eq!(survival[0].matching.len(), 1);
        assert!(!survival[1].survives);
        assert!(!survival[2].survives);
    }

    #[test]
    fn test_aftershock_preference_rules() {
        let baselines = a1b_baseline_intervals();
        let after = [PhaseInterval::new(0.5, 0.54)];
        let main = [PhaseInterval::new(0.5, 0.6)];

        assert_eq!(
            classify_aftershock_preference(&after, &main, &[0.2, 0.3], &baselines, 0.05, 0.5),
            AftershockPreference::NoPreference
        );
        assert_eq!(
            classify_aftershock_preference(&after, &main, &[0.2, 0.01], &baselines, 0.05, 0.5),
            AftershockPreference::SameAsMainshocks
        );
        assert_eq!(
            classify_aftershock_preference(&after, &[], &[0.01], &baselines, 0.05, 0.5),
            AftershockPreference::DifferentFromMainshocks
        );
        let at_baseline = [PhaseInterval::new(0.2, 0.24)];
        assert_eq!(
            classify_aftershock_preference(&at_baseline, &main, &[0.01], &baselines, 0.05, 0.5),
            AftershockPreference::MatchesBaseline
        );
        assert_eq!(
            AftershockPreference::MatchesBaseline.to_string(),
            "significant, intervals match A1b baseline"
        );
    }

    #[test]
    fn test_declustering_sensitivity_end_to_end() {
        // Raw catalog: strong peak inside baseline 1; mainshocks keep a weaker peak there;
        // aftershocks are uniform
        let raw = catalog_from_phases("raw", &with_peak(uniform_phases(96, 10), 0.22, 300));
        let mainshocks = catalog_from_phases("gk mainshocks", &with_peak(uniform_phases(96, 8), 0.22, 120));
        let aftershocks = catalog_from_phases("gk aftershocks", &uniform_phases(96, 2));

        let methods = vec![DeclusteredCatalogs {
            method: "gk".into(),
            mainshocks,
            aftershocks,
        }];
        let config = AnalysisConfig::default();
        let report = declustering_sensitivity(&raw, &methods, &config).unwrap();

        let supp = &report.scalar_survival.suppression[0];
        assert_eq!(supp.per_k.len(), 3);
        assert!(supp.per_k.iter().all(|e| e.suppression_pct > 0.0));

        let summary = &report.interval_structure.survival_summary;
        assert_eq!(summary.len(), 3);
        assert_eq!(summary[0].methods[0].status, SurvivalStatus::Survives);
        assert_eq!(summary[1].methods[0].status, SurvivalStatus::Absent);

        let after = &report.aftershock_preference[0];
        assert_eq!(after.preference, AftershockPreference::NoPreference);
        assert!(after.per_k.iter().all(|r| r.elevated.is_empty()));
    }
}
