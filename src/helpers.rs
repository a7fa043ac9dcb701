//! Numeric helpers and input validation shared across modules.

use crate::error::{Error, Result};

/// Small epsilon for numerical comparisons (e.g., avoiding division by zero).
pub const NUMERICAL_EPS: f64 = 1e-10;

/// Julian year in days, used for every solar-year normalisation.
pub const JULIAN_YEAR_DAYS: f64 = 365.25;

/// Julian year in seconds (365.25 * 86400).
pub const JULIAN_YEAR_SECS: f64 = 31_557_600.0;

/// Seconds per day.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Check that a candidate period is usable as a modulus divisor.
pub fn validate_period(period: f64) -> Result<()> {
    if period.is_finite() && period > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidPeriod(period))
    }
}

/// Check that every value is finite.
pub fn ensure_finite(values: &[f64]) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(Error::NonFinite {
            index,
            value: values[index],
        }),
        None => Ok(()),
    }
}

/// Check that event times are finite and non-decreasing.
///
/// Equal consecutive times are allowed (simultaneous events). The array is
/// never re-sorted: an out-of-order value is a caller bug.
pub fn ensure_sorted(times: &[f64]) -> Result<()> {
    ensure_finite(times)?;
    for i in 1..times.len() {
        if times[i] < times[i - 1] {
            return Err(Error::UnsortedTimes {
                index: i,
                previous: times[i - 1],
                current: times[i],
            });
        }
    }
    Ok(())
}

/// Log-spaced grid of `n` values between `min` and `max` inclusive.
///
/// # Arguments
/// * `n` - Number of grid points (>= 1)
/// * `min` - First value (> 0)
/// * `max` - Last value (>= min)
///
/// # Returns
/// Grid with `grid[0] == min` and `grid[n - 1] == max`
pub fn log_spaced_grid(n: usize, min: f64, max: f64) -> Result<Vec<f64>> {
    validate_period(min)?;
    validate_period(max)?;
    if n == 0 {
        return Err(Error::InvalidParameter(
            "grid must contain at least one point".into(),
        ));
    }
    if max < min {
        return Err(Error::InvalidParameter(format!(
            "grid maximum {max} is below minimum {min}"
        )));
    }
    if n == 1 {
        return Ok(vec![min]);
    }

    let log_min = min.ln();
    let step = (max.ln() - log_min) / (n - 1) as f64;
    let mut grid: Vec<f64> = (0..n).map(|i| (log_min + i as f64 * step).exp()).collect();
    // Pin the endpoints so rounding in exp(ln(x)) never leaks outside [min, max]
    grid[0] = min;
    grid[n - 1] = max;
    Ok(grid)
}

/// Percentile of an already sorted slice, linear interpolation between order
/// statistics (`q` in [0, 100]).
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return sorted[0];
    }
    let h = (n - 1) as f64 * (q / 100.0).clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = h - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Percentile of an unsorted slice (sorts a copy).
pub fn percentile(values: &[f64], q: f64) -> f64 {
    let sorted = sorted_copy(values);
    percentile_sorted(&sorted, q)
}

/// Median (50th percentile); 0.0 for empty input.
pub fn median(values: &[f64]) -> f64 {
    percentile(values, 50.0)
}

/// Arithmetic mean; 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Sorted copy using a total order (finite inputs expected).
pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_period() {
        assert!(validate_period(365.25).is_ok());
        assert!(matches!(validate_period(0.0), Err(Error::InvalidPeriod(_))));
        assert!(matches!(validate_period(-1.0), Err(Error::InvalidPeriod(_))));
        assert!(validate_period(f64::NAN).is_err());
        assert!(validate_period(f64::INFINITY).is_err());
    }

    #[test]
    fn test_ensure_sorted_accepts_ties() {
        assert!(ensure_sorted(&[0.0, 1.0, 1.0, 2.5]).is_ok());
        assert!(ensure_sorted(&[]).is_ok());
    }

    #[test]
    fn test_ensure_sorted_reports_first_violation() {
        match ensure_sorted(&[0.0, 2.0, 1.0, 0.5]) {
            Err(Error::UnsortedTimes {
                index,
                previous,
                current,
            }) => {
                assert_eq!(index, 2);
                assert_eq!(previous, 2.0);
                assert_eq!(current, 1.0);
            }
            other => panic!("expected UnsortedTimes, got {other:?}"),
        }
    }

    #[test]
    fn test_ensure_sorted_rejects_nan() {
        assert!(matches!(
            ensure_sorted(&[0.0, f64::NAN]),
            Err(Error::NonFinite { index: 1, .. })
        ));
    }

    #[test]
    fn test_log_spaced_grid_endpoints() {
        let grid = log_spaced_grid(200, 0.25, 548.0).unwrap();
        assert_eq!(grid.len(), 200);
        assert_eq!(grid[0], 0.25);
        assert_eq!(grid[199], 548.0);
        for w in grid.windows(2) {
            assert!(w[1] > w[0]);
        }
        // Constant ratio between neighbours
        let r0 = grid[1] / grid[0];
        let r1 = grid[150] / grid[149];
        assert!((r0 - r1).abs() < 1e-9);
    }

    #[test]
    fn test_log_spaced_grid_rejects_bad_bounds() {
        assert!(log_spaced_grid(10, 0.0, 1.0).is_err());
        assert!(log_spaced_grid(10, 5.0, 1.0).is_err());
        assert!(log_spaced_grid(0, 1.0, 5.0).is_err());
        assert_eq!(log_spaced_grid(1, 2.0, 5.0).unwrap(), vec![2.0]);
    }

    #[test]
    fn test_percentile_linear_interpolation() {
        let values = vec![4.0, 1.0, 3.0, 2.0, 5.0];
        assert!((percentile(&values, 50.0) - 3.0).abs() < NUMERICAL_EPS);
        assert!((percentile(&values, 0.0) - 1.0).abs() < NUMERICAL_EPS);
        assert!((percentile(&values, 100.0) - 5.0).abs() < NUMERICAL_EPS);
        // h = 4 * 0.95 = 3.8 -> 4 + 0.8 * (5 - 4)
        assert!((percentile(&values, 95.0) - 4.8).abs() < NUMERICAL_EPS);
    }

    #[test]
    fn test_median_and_mean_empty() {
        assert_eq!(median(&[]), 0.0);
        assert_eq!(mean(&[]), 0.0);
        assert!((median(&[1.0, 2.0, 3.0, 4.0]) - 2.5).abs() < NUMERICAL_EPS);
    }
}
