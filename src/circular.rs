//! Circular statistics kernel.
//!
//! Phase fractions live on [0, 1) and angles on [0, 2π). Everything here is a
//! pure function of its inputs. Empty input never raises: it resolves to the
//! degenerate "no signal" values `R = 0`, `p = 1`.

use crate::error::Result;
use crate::helpers::validate_period;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// 2π.
pub const TWO_PI: f64 = 2.0 * PI;

/// Mean resultant vector of a set of angles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeanResultant {
    /// Mean resultant length in [0, 1]
    pub r: f64,
    /// Mean direction in [0, 2π)
    pub mean_angle: f64,
    /// Mean direction as a phase fraction in [0, 1)
    pub mean_phase: f64,
}

/// Result of the Rayleigh test for non-uniformity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RayleighTest {
    /// Number of phases tested
    pub n: usize,
    /// Mean resultant length
    pub r: f64,
    /// Rayleigh statistic n·R²
    pub z: f64,
    /// Large-sample p-value exp(-n·R²)
    pub p_value: f64,
    /// Mean phase fraction in [0, 1)
    pub mean_phase: f64,
}

/// Wrap a value onto [0, 1), mapping a rounding result of exactly 1.0 to 0.0.
#[inline]
fn wrap_unit(x: f64) -> f64 {
    let w = x.rem_euclid(1.0);
    if w >= 1.0 {
        0.0
    } else {
        w
    }
}

/// Phase fraction of time `t` for a candidate period, without validating the period.
#[inline]
pub(crate) fn phase_unchecked(t: f64, period: f64) -> f64 {
    wrap_unit(t.rem_euclid(period) / period)
}

/// Phase fraction `(t mod period) / period` in [0, 1).
///
/// `t = 0` and exact multiples of the period give 0.0. Negative times use the
/// Euclidean remainder, so the result is still in [0, 1).
///
/// # Errors
/// `InvalidPeriod` when `period` is not strictly positive and finite.
pub fn phase(t: f64, period: f64) -> Result<f64> {
    validate_period(period)?;
    Ok(phase_unchecked(t, period))
}

/// Phase fractions for every time, validating the period once.
pub fn phases(times: &[f64], period: f64) -> Result<Vec<f64>> {
    validate_period(period)?;
    Ok(times.iter().map(|&t| phase_unchecked(t, period)).collect())
}

/// Convert a phase fraction to radians.
#[inline]
pub fn to_angle(fraction: f64) -> f64 {
    TWO_PI * fraction
}

/// Convert an angle in radians to a phase fraction in [0, 1).
#[inline]
pub fn angle_to_fraction(angle: f64) -> f64 {
    wrap_unit(angle / TWO_PI)
}

/// Mean resultant length and direction of a set of angles (radians).
///
/// Empty input gives `R = 0` with direction 0.
pub fn mean_resultant(angles: &[f64]) -> MeanResultant {
    let n = angles.len();
    if n == 0 {
        return MeanResultant {
            r: 0.0,
            mean_angle: 0.0,
            mean_phase: 0.0,
        };
    }

    let (mut c, mut s) = (0.0, 0.0);
    for &a in angles {
        c += a.cos();
        s += a.sin();
    }
    c /= n as f64;
    s /= n as f64;

    let r = (c * c + s * s).sqrt().min(1.0);
    let mean_angle = s.atan2(c).rem_euclid(TWO_PI);
    let mean_angle = if mean_angle >= TWO_PI { 0.0 } else { mean_angle };

    MeanResultant {
        r,
        mean_angle,
        mean_phase: angle_to_fraction(mean_angle),
    }
}

/// Mean resultant of phase fractions (converted to angles first).
pub fn mean_resultant_of_phases(phases: &[f64]) -> MeanResultant {
    let angles: Vec<f64> = phases.iter().map(|&p| to_angle(p)).collect();
    mean_resultant(&angles)
}

/// Rayleigh test on phase fractions.
///
/// Uses the large-sample approximation `p = exp(-n·R²)` with no small-sample
/// correction, so p-values for n below ~10 are only indicative.
pub fn rayleigh(phases: &[f64]) -> RayleighTest {
    let n = phases.len();
    let mr = mean_resultant_of_phases(phases);
    let z = n as f64 * mr.r * mr.r;
    RayleighTest {
        n,
        r: mr.r,
        z,
        p_value: (-z).exp().min(1.0),
        mean_phase: mr.mean_phase,
    }
}

/// Shortest distance between two phase fractions on the unit circle, in [0, 0.5].
pub fn circular_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(1.0);
    d.min(1.0 - d)
}

/// Circular variance and circular standard deviation (degrees) of phase fractions.
///
/// Returns `(1 - R, sqrt(-2 ln R))` with R floored at 1e-15 so the deviation
/// stays finite for a perfectly uniform set.
pub fn circular_spread(phases: &[f64]) -> (f64, f64) {
    let r = mean_resultant_of_phases(phases).r;
    let variance = 1.0 - r;
    let std_deg = (-2.0 * r.max(1e-15).ln()).sqrt().to_degrees();
    (variance, std_deg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_phase_zero_and_multiples() {
        assert_eq!(phase(0.0, 365.25).unwrap(), 0.0);
        assert_eq!(phase(730.5, 365.25).unwrap(), 0.0);
        assert_eq!(phase(3.0, 1.5).unwrap(), 0.0);
    }

    #[test]
    fn test_phase_fraction() {
        let p = phase(100.0, 400.0).unwrap();
        assert!((p - 0.25).abs() < 1e-12);
        let p = phase(-100.0, 400.0).unwrap();
        assert!((p - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_phase_rejects_bad_period() {
        assert!(matches!(phase(1.0, 0.0), Err(Error::InvalidPeriod(_))));
        assert!(matches!(phase(1.0, -2.0), Err(Error::InvalidPeriod(_))));
        assert!(phases(&[1.0, 2.0], f64::NAN).is_err());
    }

    #[test]
    fn test_to_angle_range() {
        assert_eq!(to_angle(0.0), 0.0);
        assert!((to_angle(0.5) - PI).abs() < 1e-12);
        assert!((angle_to_fraction(-PI / 2.0) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_mean_resultant_aligned() {
        let angles = vec![1.0; 10];
        let mr = mean_resultant(&angles);
        assert!((mr.r - 1.0).abs() < 1e-12);
        assert!((mr.mean_angle - 1.0).abs() < 1e-12);
        assert!((mr.mean_phase - 1.0 / TWO_PI).abs() < 1e-12);
    }

    #[test]
    fn test_mean_resultant_opposed() {
        let mr = mean_resultant(&[0.0, PI]);
        assert!(mr.r < 1e-12);
    }

    #[test]
    fn test_mean_resultant_negative_direction_normalised() {
        // Mean direction at -π/2 should come back as 3π/2 and phase 0.75
        let mr = mean_resultant(&[-PI / 2.0 - 0.1, -PI / 2.0 + 0.1]);
        assert!((mr.mean_angle - 1.5 * PI).abs() < 1e-9);
        assert!((mr.mean_phase - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_rayleigh_empty_is_degenerate() {
        let test = rayleigh(&[]);
        assert_eq!(test.n, 0);
        assert_eq!(test.r, 0.0);
        assert_eq!(test.p_value, 1.0);
    }

    #[test]
    fn test_rayleigh_concentrated() {
        let phases: Vec<f64> = (0..200).map(|i| 0.2 + 0.001 * (i % 5) as f64).collect();
        let test = rayleigh(&phases);
        assert!(test.r > 0.99);
        assert!(test.p_value < 1e-50);
        assert!((test.mean_phase - 0.202).abs() < 1e-3);
    }

    #[test]
    fn test_rayleigh_evenly_spread() {
        let phases: Vec<f64> = (0..24).map(|i| (i as f64 + 0.5) / 24.0).collect();
        let test = rayleigh(&phases);
        assert!(test.r < 1e-12);
        assert!((test.p_value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_circular_distance_wraps() {
        assert!((circular_distance(0.95, 0.05) - 0.1).abs() < 1e-12);
        assert!((circular_distance(0.25, 0.75) - 0.5).abs() < 1e-12);
        assert_eq!(circular_distance(0.3, 0.3), 0.0);
    }

    #[test]
    fn test_circular_spread() {
        let (var, std_deg) = circular_spread(&[0.1; 8]);
        assert!(var.abs() < 1e-12);
        assert!(std_deg < 1e-4);

        let spread: Vec<f64> = (0..4).map(|i| i as f64 / 4.0).collect();
        let (var, std_deg) = circular_spread(&spread);
        assert!((var - 1.0).abs() < 1e-12);
        assert!(std_deg.is_finite());
    }
}
