//! Seeded resampling utilities shared by the bootstrap and subsample nulls.
//!
//! Every replicate derives its own generator from `(seed, replicate index)`.
//! Replicates are therefore independent of evaluation order, and the rayon
//! and sequential paths draw identical numbers.

use crate::error::{Error, Result};
use crate::helpers::{percentile_sorted, sorted_copy};
use crate::iter_maybe_parallel;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;
use serde::{Deserialize, Serialize};

/// Seed for replicate `index` of a stream rooted at `seed`.
///
/// `StdRng::seed_from_u64` scrambles its input, so consecutive seeds give
/// unrelated generators.
#[inline]
pub fn replicate_seed(seed: u64, index: u64) -> u64 {
    seed.wrapping_add(index)
}

/// Generator for replicate `index` of a stream rooted at `seed`.
pub fn replicate_rng(seed: u64, index: usize) -> StdRng {
    StdRng::seed_from_u64(replicate_seed(seed, index as u64))
}

/// 2.5 / 50 / 97.5 percentiles of a null distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NullInterval {
    /// 2.5th percentile
    pub p2_5: f64,
    /// Median
    pub p50: f64,
    /// 97.5th percentile
    pub p97_5: f64,
}

impl NullInterval {
    /// Summarise a set of null statistic values.
    pub fn from_values(values: &[f64]) -> Self {
        let sorted = sorted_copy(values);
        Self {
            p2_5: percentile_sorted(&sorted, 2.5),
            p50: percentile_sorted(&sorted, 50.0),
            p97_5: percentile_sorted(&sorted, 97.5),
        }
    }

    /// True if `value` lies strictly outside `[p2_5, p97_5]`.
    pub fn excludes(&self, value: f64) -> bool {
        value < self.p2_5 || value > self.p97_5
    }
}

/// Indices of a resample with replacement of size `n`.
pub fn bootstrap_indices<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Vec<usize> {
    (0..n).map(|_| rng.gen_range(0..n)).collect()
}

/// Null distribution of a statistic over random subsets drawn without replacement.
///
/// Each of `n_samples` replicates draws `sample_size` distinct indices from
/// `0..population` and evaluates `statistic` on them (indices sorted ascending,
/// so callers with time-sorted data keep that order).
///
/// # Arguments
/// * `population` - Size of the population to draw from
/// * `sample_size` - Indices per replicate (<= population)
/// * `n_samples` - Number of replicates
/// * `seed` - Root seed
/// * `statistic` - Statistic evaluated on each index subset
pub fn subsample_null<F>(
    population: usize,
    sample_size: usize,
    n_samples: usize,
    seed: u64,
    statistic: F,
) -> Result<Vec<f64>>
where
    F: Fn(&[usize]) -> f64 + Sync + Send,
{
    if sample_size > population {
        return Err(Error::InvalidParameter(format!(
            "subsample size {sample_size} exceeds population {population}"
        )));
    }

    let values: Vec<f64> = iter_maybe_parallel!(0..n_samples)
        .map(|i| {
            let mut rng = replicate_rng(seed, i);
            let mut idx = index::sample(&mut rng, population, sample_size).into_vec();
            idx.sort_unstable();
            statistic(&idx)
        })
        .collect();
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replicate_seed_distinct_and_stable() {
        let a = replicate_seed(42, 0);
        let b = replicate_seed(42, 1);
        assert_ne!(a, b);
        assert_eq!(a, replicate_seed(42, 0));
        assert_eq!(replicate_seed(u64::MAX, 1), 0);
    }

    #[test]
    fn test_replicate_rng_reproducible() {
        let x: f64 = replicate_rng(7, 3).gen();
        let y: f64 = replicate_rng(7, 3).gen();
        assert_eq!(x, y);
        let z: f64 = replicate_rng(7, 4).gen();
        assert_ne!(x, z);
    }

    #[test]
    fn test_null_interval_from_values() {
        let values: Vec<f64> = (0..=200).map(|i| i as f64).collect();
        let ci = NullInterval::from_values(&values);
        assert!((ci.p2_5 - 5.0).abs() < 1e-12);
        assert!((ci.p50 - 100.0).abs() < 1e-12);
        assert!((ci.p97_5 - 195.0).abs() < 1e-12);
        assert!(ci.excludes(1.0));
        assert!(!ci.excludes(100.0));
    }

    #[test]
    fn test_bootstrap_indices_in_range() {
        let mut rng = StdRng::seed_from_u64(1);
        let idx = bootstrap_indices(&mut rng, 50);
        assert_eq!(idx.len(), 50);
        assert!(idx.iter().all(|&i| i < 50));
    }

    #[test]
    fn test_subsample_null_distinct_sorted_indices() {
        let values = subsample_null(100, 10, 20, 42, |idx| {
            assert_eq!(idx.len(), 10);
            assert!(idx.windows(2).all(|w| w[0] < w[1]));
            idx.iter().sum::<usize>() as f64
        })
        .unwrap();
        assert_eq!(values.len(), 20);

        let again = subsample_null(100, 10, 20, 42, |idx| idx.iter().sum::<usize>() as f64).unwrap();
        assert_eq!(values, again);
    }

    #[test]
    fn test_subsample_null_rejects_oversized_sample() {
        assert!(subsample_null(5, 6, 10, 0, |_| 0.0).is_err());
    }
}
