//! End-to-end scenarios on synthetic catalogs.
//!
//! Each scenario builds its data from a fixed seed, so the assertions are
//! deterministic.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Uniform};
use seisphase_core::binning::{bin_counts, chi_square_uniform};
use seisphase_core::circular::circular_distance;
use seisphase_core::config::MfpaParams;
use seisphase_core::report::to_json_string;
use seisphase_core::{
    mfpa_scan, phases, rayleigh, schuster_single_period, AnalysisConfig, Catalog, Event,
    JULIAN_YEAR_DAYS,
};

const YEARS: f64 = 72.0;

fn uniform_times(rng: &mut StdRng, n: usize) -> Vec<f64> {
    let span = Uniform::new(0.0, YEARS * JULIAN_YEAR_DAYS);
    let mut times: Vec<f64> = (0..n).map(|_| span.sample(rng)).collect();
    times.sort_by(f64::total_cmp);
    times
}

#[test]
fn uniform_phases_rarely_significant() {
    let mut rng = StdRng::seed_from_u64(42);
    let trials = 100;
    let mut schuster_quiet = 0;
    let mut rayleigh_quiet = 0;
    for _ in 0..trials {
        let times = uniform_times(&mut rng, 1000);
        let test = schuster_single_period(&times, JULIAN_YEAR_DAYS, 1.0).unwrap();
        if test.standard.p_value > 0.05 {
            schuster_quiet += 1;
        }
        let ph = phases(&times, JULIAN_YEAR_DAYS).unwrap();
        if rayleigh(&ph).p_value > 0.05 {
            rayleigh_quiet += 1;
        }
    }
    assert!(schuster_quiet >= 90, "only {schuster_quiet}/{trials} quiet");
    assert!(rayleigh_quiet >= 90, "only {rayleigh_quiet}/{trials} quiet");
}

#[test]
fn clustered_annual_signal_detected() {
    let mut rng = StdRng::seed_from_u64(7);
    let jitter = Uniform::new(-0.02, 0.02);
    let mut times: Vec<f64> = (0..900)
        .map(|_| {
            let year = rng.gen_range(0..72) as f64;
            (year + 0.2 + jitter.sample(&mut rng)) * JULIAN_YEAR_DAYS
        })
        .collect();
    times.extend(uniform_times(&mut rng, 100));
    times.sort_by(f64::total_cmp);

    let test = schuster_single_period(&times, JULIAN_YEAR_DAYS, 1.0).unwrap();
    assert!(test.standard.p_value < 0.001);
    assert!(test.cluster_robust.n_clusters <= test.standard.n_events);

    let ray = rayleigh(&phases(&times, JULIAN_YEAR_DAYS).unwrap());
    assert!(circular_distance(ray.mean_phase, 0.2) < 0.02);
}

#[test]
fn mfpa_scan_shape_on_uniform_times() {
    let mut rng = StdRng::seed_from_u64(3);
    let times = uniform_times(&mut rng, 500);
    let scan = mfpa_scan(&times, &MfpaParams::default()).unwrap();

    assert_eq!(scan.spectrum.len(), 300);
    let periods: Vec<f64> = scan.spectrum.iter().map(|p| p.period_days).collect();
    assert!((periods[0] - 0.25).abs() < 1e-9);
    assert!((periods[299] - 548.0).abs() < 1e-9);
    assert!(periods.windows(2).all(|w| w[0] < w[1]));
    assert!(scan.spectrum.iter().all(|p| p.power >= 0.0 && p.power.is_finite()));
    assert!(scan.spectrum.iter().all(|p| (0.0..=1.0).contains(&p.p_value)));
}

#[test]
fn perfectly_uniform_histogram() {
    let phases: Vec<f64> = (0..24)
        .flat_map(|b| std::iter::repeat((b as f64 + 0.5) / 24.0).take(10))
        .collect();
    let test = chi_square_uniform(&bin_counts(&phases, 24).unwrap()).unwrap();
    assert!(test.chi2.abs() < 1e-6);
    assert!((test.p_value - 1.0).abs() < 1e-6);
}

#[test]
fn single_spike_bin_significant() {
    let mut phases: Vec<f64> = (0..24)
        .flat_map(|b| std::iter::repeat((b as f64 + 0.5) / 24.0).take(100))
        .collect();
    phases.extend(std::iter::repeat(0.5 / 24.0).take(500));
    let test = chi_square_uniform(&bin_counts(&phases, 24).unwrap()).unwrap();
    assert!(test.p_value < 0.01);
}

#[test]
fn hemisphere_report_serializes() {
    let mut rng = StdRng::seed_from_u64(11);
    let around = Normal::<f64>::new(0.22, 0.01).unwrap();
    let background = Uniform::new(0.0, 1.0);
    let mut events = Vec::new();
    for i in 0..2000 {
        let phase = if i % 3 == 0 {
            around.sample(&mut rng).rem_euclid(1.0)
        } else {
            background.sample(&mut rng)
        };
        let lat = if i % 2 == 0 { 35.0 } else { -20.0 };
        events.push(Event::new(i as f64 * 2.0, phase, 6.4, lat, 140.0));
    }
    let catalog = Catalog::new("synthetic", events).unwrap();
    let config = AnalysisConfig::from_json_str(r#"{ "n_bootstrap": 20 }"#).unwrap();

    let report = seisphase_core::hemisphere_analysis(&catalog, &config).unwrap();
    assert_eq!(report.n_north + report.n_south, 2000);
    let primary = report.tests.primary.unwrap();
    assert!(primary.in_nh && primary.in_sh);

    let json = to_json_string(&report).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(value["predictions"]["geometric"].is_string());
    assert!(value["tests"]["global"]["classification"].is_string());
}
