//! Top-level analyses over a catalog.
//!
//! [`periodicity_analysis`] runs the period scans (Schuster spectrum, named
//! periods, MFPA). [`phase_structure`] looks at the annual phase histogram:
//! bin statistics and elevated intervals per bin count, the consensus elevated
//! set, and the temporal and spatial clustering of the events inside it.

use crate::binning::{bin_statistics, BinStats};
use crate::catalog::Catalog;
use crate::config::AnalysisConfig;
use crate::consensus::{consensus_elevated_set, ConsensusSet};
use crate::error::Result;
use crate::interevent::{iei_null_comparison, IeiComparison};
use crate::intervals::{elevated_from_counts, ElevatedInterval};
use crate::mfpa::{mfpa_scan_with_baselines, MfpaScan, SignificantPeriod};
use crate::schuster::{schuster_named_tests, schuster_spectrum, NamedPeriodTest, SchusterSpectrum, NAMED_PERIODS};
use crate::spatial::{clustering_footprint, nn_null_comparison, ClusteringFootprint, NnComparison};
use serde::Serialize;
use tracing::{info, warn};

/// Period scans of one catalog.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodicityReport {
    /// Catalog label
    pub label: String,
    pub n_events: usize,
    /// Temporal clusters at the configured gap
    pub n_clusters: usize,
    pub schuster: SchusterSpectrum,
    pub named_periods: Vec<NamedPeriodTest>,
    pub mfpa: MfpaScan,
    /// Periods with cluster-robust Schuster p below alpha
    pub schuster_significant_periods: Vec<f64>,
    /// Periods whose MFPA power exceeds the null 95th percentile
    pub mfpa_significant_periods: Vec<SignificantPeriod>,
}

/// Run the Schuster spectrum, the named-period tests and the MFPA scan.
pub fn periodicity_analysis(catalog: &Catalog, config: &AnalysisConfig) -> Result<PeriodicityReport> {
    config.validate()?;
    let times = catalog.times();
    let grid = config.schuster_grid.periods()?;

    let schuster = schuster_spectrum(&times, &grid, config.cluster_gap_days)?;
    let named_periods = schuster_named_tests(&times, &NAMED_PERIODS, config.cluster_gap_days)?;
    let mfpa = mfpa_scan_with_baselines(&times, &config.mfpa, &config.baselines)?;

    let schuster_significant_periods = schuster.significant_cluster_robust(config.alpha);
    let mfpa_significant_periods = mfpa.significant_periods.clone();

    info!(
        label = catalog.label(),
        n_events = times.len(),
        n_clusters = schuster.n_clusters,
        n_schuster_significant = schuster_significant_periods.len(),
        n_mfpa_significant = mfpa_significant_periods.len(),
        "periodicity analysis"
    );

    Ok(PeriodicityReport {
        label: catalog.label().to_string(),
        n_events: times.len(),
        n_clusters: schuster.n_clusters,
        schuster,
        named_periods,
        mfpa,
        schuster_significant_periods,
        mfpa_significant_periods,
    })
}

/// Bin statistics and elevated intervals at one bin count.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseBinResult {
    pub stats: BinStats,
    pub elevated: Vec<ElevatedInterval>,
}

/// Phase-histogram structure of one catalog.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseStructureReport {
    pub label: String,
    pub n_events: usize,
    pub per_k: Vec<PhaseBinResult>,
    pub consensus: ConsensusSet,
    /// Inter-event intervals of the events inside the consensus set
    pub temporal: Option<IeiComparison>,
    /// Nearest-neighbour distances of the events inside the consensus set
    pub spatial: Option<NnComparison>,
    pub footprint: Option<ClusteringFootprint>,
}

/// Phase-histogram analysis of a catalog.
///
/// The temporal and spatial comparisons need at least two events inside the
/// consensus set and are skipped otherwise. The spatial null uses the stream
/// `seed + 1` so the two nulls never share replicates.
pub fn phase_structure(catalog: &Catalog, config: &AnalysisConfig) -> Result<PhaseStructureReport> {
    config.validate()?;
    let phases = catalog.phases();

    let per_k = config
        .bin_counts
        .iter()
        .map(|&k| {
            let stats = bin_statistics(&phases, k)?;
            let elevated =
                elevated_from_counts(&phases, &stats.counts, &config.baselines, config.overlap_threshold);
            Ok(PhaseBinResult { stats, elevated })
        })
        .collect::<Result<Vec<_>>>()?;

    let consensus = consensus_elevated_set(
        &phases,
        &config.bin_counts,
        config.consensus_top_n,
        config.consensus_min_votes,
    )?;

    let inside = catalog.filter(format!("{} (consensus)", catalog.label()), |e| {
        consensus.intervals.iter().any(|iv| iv.contains(e.solar_phase))
    });

    let (temporal, spatial, footprint) = if inside.len() >= 2 {
        let temporal = iei_null_comparison(&inside, catalog, config.n_bootstrap, config.seed)?;
        let spatial =
            nn_null_comparison(&inside, catalog, config.n_bootstrap, config.seed.wrapping_add(1))?;
        let footprint = clustering_footprint(&spatial.observed, &temporal.observed);
        (Some(temporal), Some(spatial), Some(footprint))
    } else {
        warn!(n_inside = inside.len(), "too few consensus events for clustering comparisons");
        (None, None, None)
    };

    Ok(PhaseStructureReport {
        label: catalog.label().to_string(),
        n_events: catalog.len(),
        per_k,
        consensus,
        temporal,
        spatial,
        footprint,
    })
}
