//! JSON serialization of result records.
//!
//! Every report type derives `Serialize`; these helpers are the single place
//! records become JSON. Non-finite floats (only an infinite Cramér's V ratio
//! can produce one) are written as `null` by serde_json.

use crate::error::Result;
use serde::Serialize;
use std::io::Write;

/// Pretty-printed JSON.
pub fn to_json_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Write pretty-printed JSON followed by a newline.
pub fn write_json<W: Write, T: Serialize + ?Sized>(mut writer: W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circular::rayleigh;
    use crate::intervals::{a1b_baseline_intervals, find_elevated_intervals};

    #[test]
    fn test_to_json_string_record() {
        let json = to_json_string(&rayleigh(&[0.25, 0.25])).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["n"], 2);
        assert!((value["mean_phase"].as_f64().unwrap() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_write_json_elevated_intervals() {
        let mut phases: Vec<f64> = (0..240).map(|i| (i as f64 + 0.5) / 240.0).collect();
        phases.extend(std::iter::repeat(0.4).take(60));
        let found = find_elevated_intervals(&phases, 24, &a1b_baseline_intervals(), 0.5).unwrap();

        let mut buf = Vec::new();
        write_json(&mut buf, &found).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let first = &value[0];
        for key in ["phase_start", "phase_end", "mean_phase", "classification", "n_events", "r_coherence"] {
            assert!(first.get(key).is_some(), "missing {key}");
        }
        assert_eq!(first["classification"], "new interval");
    }

    #[test]
    fn test_infinite_ratio_serializes_as_null() {
        let json = to_json_string(&[f64::INFINITY]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value[0].is_null());
    }
}
