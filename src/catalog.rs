//! Event catalogs and time conversions.
//!
//! A [`Catalog`] is a labelled list of events sorted by time. Construction
//! checks the ordering instead of sorting behind the caller's back; loaders
//! that read unsorted files go through [`Catalog::from_unsorted`].

use crate::error::{Error, Result};
use crate::helpers::{ensure_sorted, JULIAN_YEAR_SECS, SECONDS_PER_DAY};
use chrono::{DateTime, Datelike, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Unix timestamp of the reference epoch, 1950-01-01T00:00:00Z.
pub const REFERENCE_EPOCH_UNIX_SECS: i64 = -631_152_000;

/// A single earthquake.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Decimal days since the catalog epoch
    pub time_days: f64,
    /// Solar-year phase fraction in [0, 1)
    pub solar_phase: f64,
    /// Magnitude
    pub magnitude: f64,
    /// Latitude (degrees, north positive)
    pub latitude: f64,
    /// Longitude (degrees, east positive)
    pub longitude: f64,
}

impl Event {
    pub fn new(time_days: f64, solar_phase: f64, magnitude: f64, latitude: f64, longitude: f64) -> Self {
        Self {
            time_days,
            solar_phase,
            magnitude,
            latitude,
            longitude,
        }
    }

    fn validate(&self, index: usize) -> Result<()> {
        for value in [
            self.time_days,
            self.solar_phase,
            self.magnitude,
            self.latitude,
            self.longitude,
        ] {
            if !value.is_finite() {
                return Err(Error::NonFinite { index, value });
            }
        }
        if !(0.0..1.0).contains(&self.solar_phase) {
            return Err(Error::InvalidParameter(format!(
                "solar phase of event {index} must lie in [0, 1), got {}",
                self.solar_phase
            )));
        }
        Ok(())
    }
}

/// Events split by hemisphere. Events on the equator go to neither side.
#[derive(Debug, Clone)]
pub struct HemisphereSplit {
    pub north: Catalog,
    pub south: Catalog,
    pub n_equatorial: usize,
}

/// A labelled, time-sorted event list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Catalog {
    label: String,
    events: Vec<Event>,
}

impl Catalog {
    /// Build a catalog from events already sorted by time.
    ///
    /// # Errors
    /// `UnsortedTimes` if times decrease, `NonFinite` for NaN or infinite
    /// fields, `InvalidParameter` for a phase outside [0, 1).
    pub fn new(label: impl Into<String>, events: Vec<Event>) -> Result<Self> {
        for (i, e) in events.iter().enumerate() {
            e.validate(i)?;
        }
        let times: Vec<f64> = events.iter().map(|e| e.time_days).collect();
        ensure_sorted(&times)?;
        Ok(Self {
            label: label.into(),
            events,
        })
    }

    /// Sort events by time, then validate.
    pub fn from_unsorted(label: impl Into<String>, mut events: Vec<Event>) -> Result<Self> {
        events.sort_by(|a, b| a.time_days.total_cmp(&b.time_days));
        Self::new(label, events)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Event times in days, ascending.
    pub fn times(&self) -> Vec<f64> {
        self.events.iter().map(|e| e.time_days).collect()
    }

    /// Solar phase fractions in event order.
    pub fn phases(&self) -> Vec<f64> {
        self.events.iter().map(|e| e.solar_phase).collect()
    }

    /// Subset keeping time order.
    pub fn filter<F>(&self, label: impl Into<String>, keep: F) -> Catalog
    where
        F: Fn(&Event) -> bool,
    {
        Catalog {
            label: label.into(),
            events: self.events.iter().copied().filter(|e| keep(e)).collect(),
        }
    }

    /// Split by latitude sign.
    pub fn hemispheres(&self) -> HemisphereSplit {
        HemisphereSplit {
            north: self.filter(format!("{} (NH)", self.label), |e| e.latitude > 0.0),
            south: self.filter(format!("{} (SH)", self.label), |e| e.latitude < 0.0),
            n_equatorial: self.events.iter().filter(|e| e.latitude == 0.0).count(),
        }
    }

    /// Events with magnitude in `[min, max)`.
    pub fn magnitude_band(&self, label: impl Into<String>, min: f64, max: f64) -> Catalog {
        self.filter(label, |e| e.magnitude >= min && e.magnitude < max)
    }
}

/// Phase fraction of a position within the solar year, `(secs / year_secs) mod 1`.
pub fn solar_phase_from_secs(secs: f64, year_secs: f64) -> Result<f64> {
    crate::circular::phase(secs, year_secs)
}

/// Phase fraction using the Julian year (31 557 600 s).
pub fn solar_phase_julian(secs: f64) -> Result<f64> {
    solar_phase_from_secs(secs, JULIAN_YEAR_SECS)
}

/// The reference epoch 1950-01-01T00:00:00Z.
pub fn reference_epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(REFERENCE_EPOCH_UNIX_SECS, 0).unwrap_or_default()
}

/// Decimal days from `epoch` to `timestamp` (negative before the epoch).
pub fn event_time_days(timestamp: DateTime<Utc>, epoch: DateTime<Utc>) -> f64 {
    let delta = timestamp.signed_duration_since(epoch);
    delta.num_seconds() as f64 / SECONDS_PER_DAY
        + f64::from(delta.subsec_nanos()) / (SECONDS_PER_DAY * 1e9)
}

/// Calendar year (UTC) of an event time given in days since `epoch`.
pub fn event_year(time_days: f64, epoch: DateTime<Utc>) -> Result<i32> {
    let out_of_range = || Error::InvalidParameter(format!("event time {time_days} days is out of range"));
    if !time_days.is_finite() {
        return Err(out_of_range());
    }
    let millis = (time_days * SECONDS_PER_DAY * 1000.0).round();
    let delta = TimeDelta::try_milliseconds(millis as i64).ok_or_else(out_of_range)?;
    let when = epoch.checked_add_signed(delta).ok_or_else(out_of_range)?;
    Ok(when.year())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ev(t: f64, phase: f64, mag: f64, lat: f64) -> Event {
        Event::new(t, phase, mag, lat, 0.0)
    }

    #[test]
    fn test_catalog_requires_sorted() {
        let events = vec![ev(1.0, 0.1, 6.0, 10.0), ev(0.5, 0.2, 6.0, 10.0)];
        assert!(matches!(
            Catalog::new("raw", events.clone()),
            Err(Error::UnsortedTimes { index: 1, .. })
        ));
        let cat = Catalog::from_unsorted("raw", events).unwrap();
        assert_eq!(cat.times(), vec![0.5, 1.0]);
        assert_eq!(cat.label(), "raw");
    }

    #[test]
    fn test_catalog_rejects_bad_phase_and_nan() {
        assert!(matches!(
            Catalog::new("x", vec![ev(0.0, 1.0, 6.0, 0.0)]),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            Catalog::new("x", vec![ev(0.0, 0.5, f64::NAN, 0.0)]),
            Err(Error::NonFinite { index: 0, .. })
        ));
    }

    #[test]
    fn test_hemisphere_split() {
        let cat = Catalog::new(
            "raw",
            vec![
                ev(0.0, 0.1, 6.0, 10.0),
                ev(1.0, 0.2, 6.0, -5.0),
                ev(2.0, 0.3, 6.0, 0.0),
                ev(3.0, 0.4, 6.0, 45.0),
            ],
        )
        .unwrap();
        let split = cat.hemispheres();
        assert_eq!(split.north.len(), 2);
        assert_eq!(split.south.len(), 1);
        assert_eq!(split.n_equatorial, 1);
        assert_eq!(split.north.phases(), vec![0.1, 0.4]);
    }

    #[test]
    fn test_magnitude_band_half_open() {
        let cat = Catalog::new(
            "raw",
            vec![ev(0.0, 0.1, 6.0, 1.0), ev(1.0, 0.1, 6.5, 1.0), ev(2.0, 0.1, 6.49, 1.0)],
        )
        .unwrap();
        let band = cat.magnitude_band("M6.0-6.4", 6.0, 6.5);
        assert_eq!(band.len(), 2);
    }

    #[test]
    fn test_solar_phase_from_secs() {
        let p = solar_phase_julian(JULIAN_YEAR_SECS / 4.0).unwrap();
        assert!((p - 0.25).abs() < 1e-12);
        assert_eq!(solar_phase_julian(0.0).unwrap(), 0.0);
        assert!(solar_phase_from_secs(1.0, 0.0).is_err());
    }

    #[test]
    fn test_reference_epoch_and_days() {
        let epoch = reference_epoch();
        assert_eq!(epoch, Utc.with_ymd_and_hms(1950, 1, 1, 0, 0, 0).unwrap());
        let ts = Utc.with_ymd_and_hms(1950, 1, 11, 12, 0, 0).unwrap();
        assert!((event_time_days(ts, epoch) - 10.5).abs() < 1e-12);
    }

    #[test]
    fn test_event_year() {
        let epoch = reference_epoch();
        assert_eq!(event_year(0.0, epoch).unwrap(), 1950);
        assert_eq!(event_year(365.0, epoch).unwrap(), 1951);
        let ts = Utc.with_ymd_and_hms(1975, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(event_year(event_time_days(ts, epoch), epoch).unwrap(), 1975);
        assert!(event_year(f64::NAN, epoch).is_err());
    }
}
