//! Example: Periodicity Scan
//!
//! Builds a synthetic 72-year catalog with an annual cluster near phase 0.2,
//! runs the Schuster spectrum, named-period tests and MFPA, then prints the
//! phase-histogram structure and writes the period report as JSON.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Uniform};
use seisphase_core::config::MfpaParams;
use seisphase_core::report::write_json;
use seisphase_core::{periodicity_analysis, phase_structure, AnalysisConfig, Catalog, Event, JULIAN_YEAR_DAYS};

fn synthetic_catalog(seed: u64) -> Catalog {
    let mut rng = StdRng::seed_from_u64(seed);
    let span = Uniform::new(0.0, 72.0 * JULIAN_YEAR_DAYS);
    let jitter = Normal::new(0.0, 4.0).unwrap();
    let lat = Uniform::new(-60.0, 60.0);
    let lon = Uniform::new(-180.0, 180.0);

    let mut events = Vec::new();
    for i in 0..3000 {
        let t = if i % 5 == 0 {
            let year = rng.gen_range(0..72) as f64;
            (year + 0.2) * JULIAN_YEAR_DAYS + jitter.sample(&mut rng)
        } else {
            span.sample(&mut rng)
        };
        let phase = (t / JULIAN_YEAR_DAYS).rem_euclid(1.0);
        let magnitude = 6.0 + rng.gen::<f64>().powi(3) * 2.5;
        events.push(Event::new(t, phase, magnitude, lat.sample(&mut rng), lon.sample(&mut rng)));
    }
    Catalog::from_unsorted("synthetic", events).unwrap()
}

fn main() {
    println!("=== Example: Periodicity Scan ===\n");

    let catalog = synthetic_catalog(42);
    let config = AnalysisConfig {
        n_bootstrap: 200,
        mfpa: MfpaParams {
            n_bootstrap: 500,
            ..MfpaParams::default()
        },
        ..AnalysisConfig::default()
    };
    println!("  Events: {}", catalog.len());

    // --- Period scans ---
    let report = periodicity_analysis(&catalog, &config).unwrap();
    println!("  Clusters (gap {} d): {}", config.cluster_gap_days, report.n_clusters);

    println!("\n--- Named periods ---");
    for named in &report.named_periods {
        println!(
            "  {:<14} p_standard={:.3e}  p_cluster_robust={:.3e}",
            named.name, named.test.standard.p_value, named.test.cluster_robust.p_value
        );
    }

    if let Some(best) = report.schuster.most_significant_cluster_robust() {
        println!(
            "\n  Most significant cluster-robust period: {:.2} d (p={:.3e})",
            best.period_days, best.p_cluster_robust
        );
    }

    println!("\n--- MFPA ---");
    for sig in report.mfpa_significant_periods.iter().take(10) {
        println!(
            "  {:>8.2} d  power={:.2}  p={:.3}  {}",
            sig.period_days, sig.power, sig.p_value, sig.baseline_consistency
        );
    }

    // --- Phase structure ---
    let structure = phase_structure(&catalog, &config).unwrap();
    println!("\n--- Phase histogram ---");
    for r in &structure.per_k {
        println!(
            "  k={:>2}: chi2={:.1} p={:.2e} V={:.4}",
            r.stats.k, r.stats.chi2, r.stats.p_chi2, r.stats.cramer_v
        );
        for iv in &r.elevated {
            println!(
                "    [{:.4}, {:.4})  n={}  {}",
                iv.phase_start, iv.phase_end, iv.n_events, iv.classification
            );
        }
    }
    println!(
        "  Consensus: {} interval(s), {:.1}% of events inside vs {:.1}% expected",
        structure.consensus.intervals.len(),
        structure.consensus.inside_pct,
        structure.consensus.expected_pct
    );
    if let Some(fp) = structure.footprint {
        println!(
            "  Clustering footprint: {:.0} km, {:.1} days",
            fp.proposed_spatial_km, fp.proposed_temporal_days
        );
    }

    println!("\n--- JSON (period report) ---");
    write_json(std::io::stdout().lock(), &report.named_periods).unwrap();
}
