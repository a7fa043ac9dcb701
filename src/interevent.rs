//! Inter-event intervals of a catalog subset against a random-subset null.
//!
//! A subset that is temporally clustered (aftershock sequences, swarms) has
//! shorter inter-event intervals than a random subset of the same size drawn
//! from the whole catalog.

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::helpers::{mean, median, percentile_sorted, sorted_copy};
use crate::resampling::{subsample_null, NullInterval};
use serde::Serialize;
use tracing::info;

/// Summary of inter-event intervals (days).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IeiSummary {
    pub median: f64,
    pub mean: f64,
    pub p10: f64,
    pub p90: f64,
}

/// Observed inter-event summary and the subsample null of medians.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IeiComparison {
    pub n_subset: usize,
    pub n_population: usize,
    pub observed: IeiSummary,
    /// Null distribution of the median inter-event interval
    pub null_median: NullInterval,
    /// Observed median outside the null 95% interval
    pub outside_null: bool,
}

/// Successive differences of sorted times.
pub fn inter_event_intervals(sorted_times: &[f64]) -> Vec<f64> {
    sorted_times.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Median, mean, 10th and 90th percentile of inter-event intervals.
///
/// # Errors
/// `EmptyInput` with fewer than two times.
pub fn iei_summary(sorted_times: &[f64]) -> Result<IeiSummary> {
    if sorted_times.len() < 2 {
        return Err(Error::EmptyInput("inter-event intervals need at least two events"));
    }
    let iei = sorted_copy(&inter_event_intervals(sorted_times));
    Ok(IeiSummary {
        median: percentile_sorted(&iei, 50.0),
        mean: mean(&iei),
        p10: percentile_sorted(&iei, 10.0),
        p90: percentile_sorted(&iei, 90.0),
    })
}

/// Compare the inter-event intervals of `subset` with random subsets of
/// `population` of the same size.
///
/// Both catalogs are time sorted. Each null replicate draws indices without
/// replacement and takes the median interval of the drawn times.
pub fn iei_null_comparison(
    subset: &Catalog,
    population: &Catalog,
    n_samples: usize,
    seed: u64,
) -> Result<IeiComparison> {
    let observed = iei_summary(&subset.times())?;
    if n_samples == 0 {
        return Err(Error::InvalidParameter("null needs at least one sample".into()));
    }
    let times = population.times();
    let nulls = subsample_null(times.len(), subset.len(), n_samples, seed, |idx| {
        let drawn: Vec<f64> = idx.iter().map(|&i| times[i]).collect();
        median(&inter_event_intervals(&drawn))
    })?;
    let null_median = NullInterval::from_values(&nulls);
    let outside_null = null_median.excludes(observed.median);

    info!(
        n = subset.len(),
        median = observed.median,
        null_lo = null_median.p2_5,
        null_hi = null_median.p97_5,
        outside_null,
        "inter-event intervals"
    );

    Ok(IeiComparison {
        n_subset: subset.len(),
        n_population: population.len(),
        observed,
        null_median,
        outside_null,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Event;

    fn catalog(times: &[f64]) -> Catalog {
        let events = times
            .iter()
            .map(|&t| Event::new(t, 0.5, 6.0, 1.0, 1.0))
            .collect();
        Catalog::new("c", events).unwrap()
    }

    #[test]
    fn test_iei_summary() {
        let s = iei_summary(&[0.0, 1.0, 3.0, 6.0, 10.0]).unwrap();
        // intervals 1, 2, 3, 4
        assert!((s.median - 2.5).abs() < 1e-12);
        assert!((s.mean - 2.5).abs() < 1e-12);
        assert!((s.p10 - 1.3).abs() < 1e-12);
        assert!((s.p90 - 3.7).abs() < 1e-12);
        assert!(iei_summary(&[1.0]).is_err());
    }

    #[test]
    fn test_clustered_subset_outside_null() {
        // Population: one event per day for 1000 days
        let all: Vec<f64> = (0..1000).map(|i| i as f64).collect();
        let population = catalog(&all);
        // Subset: 50 consecutive days -> median interval 1, far below the null (~20)
        let subset = catalog(&all[100..150]);

        let cmp = iei_null_comparison(&subset, &population, 200, 42).unwrap();
        assert_eq!(cmp.n_subset, 50);
        assert!((cmp.observed.median - 1.0).abs() < 1e-12);
        assert!(cmp.null_median.p2_5 > 5.0);
        assert!(cmp.outside_null);
    }

    #[test]
    fn test_null_reproducible() {
        let all: Vec<f64> = (0..300).map(|i| i as f64 * 1.5).collect();
        let population = catalog(&all);
        let subset = catalog(&all[..30]);
        let a = iei_null_comparison(&subset, &population, 50, 9).unwrap();
        let b = iei_null_comparison(&subset, &population, 50, 9).unwrap();
        assert_eq!(a, b);
    }
}
