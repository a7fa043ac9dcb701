//! # seisphase-core
//!
//! Circular-statistics periodicity testing for earthquake catalogs.
//!
//! This crate provides:
//! - Phase folding and the circular kernel (mean resultant, Rayleigh test)
//! - Schuster spectrum with a cluster-robust variant
//! - Modified Fourier Power Analysis (MFPA) with a seeded bootstrap null
//! - Elevated phase-interval detection and classification against baselines
//! - Phase-bin statistics (chi-square, Cramér's V) and consensus sets
//! - Declustering, hemisphere, magnitude and rolling-window comparisons
//! - Inter-event and nearest-neighbour subsample nulls
//!
//! ## Data Layout
//!
//! Event times are decimal days since a fixed epoch, sorted ascending. Phases
//! are fractions in [0, 1). A [`Catalog`] carries times, solar phases,
//! magnitudes and coordinates together; the period scans only need the times.
//!
//! Every random stream is rooted at an explicit seed, and the `parallel`
//! feature (on by default) changes speed, never results.

pub mod parallel;

pub mod analysis;
pub mod binning;
pub mod catalog;
pub mod circular;
pub mod config;
pub mod consensus;
pub mod error;
pub mod helpers;
pub mod interevent;
pub mod intervals;
pub mod mfpa;
pub mod report;
pub mod resampling;
pub mod schuster;
pub mod sensitivity;
pub mod spatial;
pub mod stationarity;
pub mod stratification;
pub mod symmetry;

pub use error::{Error, Result};
pub use helpers::{JULIAN_YEAR_DAYS, JULIAN_YEAR_SECS, NUMERICAL_EPS};

// Re-export kernel and scan entry points
pub use circular::{mean_resultant, phase, phases, rayleigh, MeanResultant, RayleighTest};
pub use mfpa::{mfpa_scan, mfpa_scan_with_baselines, MfpaParams, MfpaPoint, MfpaScan};
pub use schuster::{
    assign_clusters, cluster_robust_test, schuster_named_tests, schuster_single_period,
    schuster_spectrum, standard_test, SchusterSpectrum, SchusterTest, NAMED_PERIODS,
};

// Re-export interval and binning types
pub use binning::{bin_statistics, BinStats};
pub use intervals::{
    a1b_baseline_intervals, classify_against_baseline, find_elevated_intervals, merge_adjacent,
    BaselineInterval, ElevatedInterval, IntervalClass, PhaseInterval,
};

// Re-export catalog and configuration
pub use catalog::{Catalog, Event};
pub use config::AnalysisConfig;

// Re-export top-level analyses
pub use analysis::{periodicity_analysis, phase_structure, PeriodicityReport, PhaseStructureReport};
pub use sensitivity::{declustering_sensitivity, suppression_pct, DeclusteredCatalogs};
pub use stationarity::rolling_window_stationarity;
pub use stratification::{default_magnitude_bands, magnitude_stratification};
pub use symmetry::hemisphere_analysis;
