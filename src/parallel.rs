//! Optional rayon parallelism for the embarrassingly parallel paths.
//!
//! Bootstrap replicates, per-period spectrum evaluation and nearest-neighbour
//! searches are independent per index. With the `parallel` feature they run on
//! the rayon pool; without it they fall back to plain iterators. Both paths
//! collect in index order, so results never depend on the feature.
//!
//! # Usage
//!
//! ```ignore
//! use crate::iter_maybe_parallel;
//!
//! let powers: Vec<f64> = iter_maybe_parallel!(0..n_bootstrap)
//!     .map(|i| replicate_power(seed, i))
//!     .collect();
//! ```

/// Conditionally parallel iteration over an owned range or collection.
///
/// Expands to `into_par_iter()` with the `parallel` feature and to
/// `into_iter()` otherwise. Callers need
/// `#[cfg(feature = "parallel")] use rayon::iter::ParallelIterator;` in scope
/// for the adaptor methods.
#[macro_export]
macro_rules! iter_maybe_parallel {
    ($expr:expr) => {{
        #[cfg(feature = "parallel")]
        {
            use rayon::iter::IntoParallelIterator;

            IntoParallelIterator::into_par_iter($expr)
        }
        #[cfg(not(feature = "parallel"))]
        {
            IntoIterator::into_iter($expr)
        }
    }};
}

/// Conditionally parallel iteration by reference over a slice.
#[macro_export]
macro_rules! slice_maybe_parallel {
    ($expr:expr) => {{
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            $expr.par_iter()
        }
        #[cfg(not(feature = "parallel"))]
        {
            $expr.iter()
        }
    }};
}

pub use iter_maybe_parallel;
pub use slice_maybe_parallel;

#[cfg(test)]
mod tests {
    #[cfg(feature = "parallel")]
    use rayon::iter::ParallelIterator;

    #[test]
    fn test_range_collect_preserves_order() {
        let squares: Vec<usize> = iter_maybe_parallel!(0..1000usize).map(|i| i * i).collect();
        assert_eq!(squares.len(), 1000);
        assert!(squares.iter().enumerate().all(|(i, &s)| s == i * i));
    }

    #[test]
    fn test_slice_collect_preserves_order() {
        let values: Vec<f64> = (0..257).map(|i| i as f64).collect();
        let doubled: Vec<f64> = slice_maybe_parallel!(values).map(|v| v * 2.0).collect();
        assert_eq!(doubled[0], 0.0);
        assert_eq!(doubled[256], 512.0);
    }
}
