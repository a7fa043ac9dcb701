//! Nearest-neighbour distances of a catalog subset against a random-subset null.

use crate::catalog::{Catalog, Event};
use crate::error::{Error, Result};
use crate::helpers::{median, percentile_sorted, sorted_copy};
use crate::interevent::IeiSummary;
use crate::resampling::{subsample_null, NullInterval};
use crate::slice_maybe_parallel;
#[cfg(feature = "parallel")]
use rayon::iter::ParallelIterator;
use serde::Serialize;
use tracing::{debug, info};

/// Mean Earth radius (km).
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Quartiles of nearest-neighbour distances (km).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NnSummary {
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
}

/// Observed nearest-neighbour summary and the subsample null of medians.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NnComparison {
    pub n_subset: usize,
    pub n_population: usize,
    pub observed: NnSummary,
    pub null_median: NullInterval,
    /// Observed median outside the null 95% interval
    pub outside_null: bool,
}

/// Space-time footprint of a clustered subset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClusteringFootprint {
    pub spatial_p50_km: f64,
    pub spatial_p75_km: f64,
    pub temporal_p50_days: f64,
    pub temporal_p90_days: f64,
    /// Spatial window covering most of the clustering (nearest-neighbour p75)
    pub proposed_spatial_km: f64,
    /// Temporal window covering most of the clustering (inter-event p90)
    pub proposed_temporal_days: f64,
}

/// Great-circle distance in km between two points given in degrees.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.clamp(0.0, 1.0).sqrt().asin()
}

/// Distance from each event to its nearest other event (km).
///
/// Brute force, `O(n^2)`, parallel over events.
///
/// # Errors
/// `EmptyInput` with fewer than two events.
pub fn nearest_neighbor_distances(events: &[Event]) -> Result<Vec<f64>> {
    if events.len() < 2 {
        return Err(Error::EmptyInput("nearest-neighbour distances need at least two events"));
    }
    let indexed: Vec<(usize, &Event)> = events.iter().enumerate().collect();
    let distances: Vec<f64> = slice_maybe_parallel!(indexed)
        .map(|&(i, a)| {
            events
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, b)| haversine_km(a.latitude, a.longitude, b.latitude, b.longitude))
                .fold(f64::INFINITY, f64::min)
        })
        .collect();
    debug!(n = events.len(), "nearest-neighbour distances");
    Ok(distances)
}

/// Quartiles of nearest-neighbour distances.
pub fn nn_summary(distances: &[f64]) -> NnSummary {
    let sorted = sorted_copy(distances);
    NnSummary {
        p25: percentile_sorted(&sorted, 25.0),
        p50: percentile_sorted(&sorted, 50.0),
        p75: percentile_sorted(&sorted, 75.0),
    }
}

/// Compare the nearest-neighbour distances of `subset` with random subsets of
/// `population` of the same size.
pub fn nn_null_comparison(
    subset: &Catalog,
    population: &Catalog,
    n_samples: usize,
    seed: u64,
) -> Result<NnComparison> {
    let observed = nn_summary(&nearest_neighbor_distances(subset.events())?);
    if n_samples == 0 {
        return Err(Error::InvalidParameter("null needs at least one sample".into()));
    }
    let events = population.events();
    let nulls = subsample_null(events.len(), subset.len(), n_samples, seed, |idx| {
        let drawn: Vec<Event> = idx.iter().map(|&i| events[i]).collect();
        nearest_neighbor_distances(&drawn).map_or(0.0, |d| median(&d))
    })?;
    let null_median = NullInterval::from_values(&nulls);
    let outside_null = null_median.excludes(observed.p50);

    info!(
        n = subset.len(),
        p50_km = observed.p50,
        null_lo = null_median.p2_5,
        null_hi = null_median.p97_5,
        outside_null,
        "nearest-neighbour distances"
    );

    Ok(NnComparison {
        n_subset: subset.len(),
        n_population: population.len(),
        observed,
        null_median,
        outside_null,
    })
}

/// Combine the spatial and temporal summaries into a clustering footprint.
pub fn clustering_footprint(nn: &NnSummary, iei: &IeiSummary) -> ClusteringFootprint {
    ClusteringFootprint {
        spatial_p50_km: nn.p50,
        spatial_p75_km: nn.p75,
        temporal_p50_days: iei.median,
        temporal_p90_days: iei.p90,
        proposed_spatial_km: nn.p75,
        proposed_temporal_days: iei.p90,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(t: f64, lat: f64, lon: f64) -> Event {
        Event::new(t, 0.5, 6.0, lat, lon)
    }

    #[test]
    fn test_haversine_known_distances() {
        assert_eq!(haversine_km(10.0, 20.0, 10.0, 20.0), 0.0);
        // One degree of latitude
        let d = haversine_km(0.0, 0.0, 1.0, 0.0);
        assert!((d - EARTH_RADIUS_KM * std::f64::consts::PI / 180.0).abs() < 1e-9);
        // Antipodes
        let d = haversine_km(0.0, 0.0, 0.0, 180.0);
        assert!((d - EARTH_RADIUS_KM * std::f64::consts::PI).abs() < 1e-6);
    }

    #[test]
    fn test_nearest_neighbor_excludes_self() {
        let events = [at(0.0, 0.0, 0.0), at(1.0, 0.0, 1.0), at(2.0, 0.0, 10.0)];
        let d = nearest_neighbor_distances(&events).unwrap();
        let one_deg = haversine_km(0.0, 0.0, 0.0, 1.0);
        assert!((d[0] - one_deg).abs() < 1e-9);
        assert!((d[1] - one_deg).abs() < 1e-9);
        assert!((d[2] - haversine_km(0.0, 1.0, 0.0, 10.0)).abs() < 1e-9);
        assert!(nearest_neighbor_distances(&events[..1]).is_err());
    }

    #[test]
    fn test_duplicate_locations_give_zero() {
        let events = [at(0.0, 5.0, 5.0), at(1.0, 5.0, 5.0)];
        assert_eq!(nearest_neighbor_distances(&events).unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_clustered_subset_outside_null() {
        // Population on a 20 x 20 grid with 5-degree spacing
        let mut events = Vec::new();
        let mut t = 0.0;
        for i in 0..20 {
            for j in 0..20 {
                events.push(at(t, -50.0 + 5.0 * i as f64, -50.0 + 5.0 * j as f64));
                t += 1.0;
            }
        }
        // Tight cluster of 20 events near (0, 0)
        let cluster: Vec<Event> = (0..20)
            .map(|i| at(1000.0 + i as f64, 0.01 * i as f64, 0.0))
            .collect();
        events.extend(cluster.iter().copied());
        let population = Catalog::new("all", events).unwrap();
        let subset = Catalog::new("cluster", cluster).unwrap();

        let cmp = nn_null_comparison(&subset, &population, 100, 43).unwrap();
        assert!(cmp.observed.p50 < 2.0);
        assert!(cmp.outside_null);
        assert!(cmp.observed.p25 <= cmp.observed.p50 && cmp.observed.p50 <= cmp.observed.p75);
    }

    #[test]
    fn test_clustering_footprint() {
        let nn = NnSummary { p25: 10.0, p50: 20.0, p75: 40.0 };
        let iei = IeiSummary { median: 3.0, mean: 5.0, p10: 0.5, p90: 12.0 };
        let fp = clustering_footprint(&nn, &iei);
        assert_eq!(fp.proposed_spatial_km, 40.0);
        assert_eq!(fp.proposed_temporal_days, 12.0);
    }
}
