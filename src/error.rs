//! Error types shared by every analysis module.

/// Errors raised by the periodicity engine.
///
/// The first group covers invalid input: the engine never clamps or coerces a
/// bad period, an unsorted time array, or a non-finite value. The last two
/// variants only arise at the serialization boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("event times must be sorted ascending: t[{index}] = {current} is below the preceding value {previous}")]
    UnsortedTimes {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("period must be strictly positive and finite, got {0}")]
    InvalidPeriod(f64),

    #[error("non-finite value {value} at index {index}")]
    NonFinite { index: usize, value: f64 },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsorted_message_names_both_values() {
        let err = Error::UnsortedTimes {
            index: 3,
            previous: 10.0,
            current: 9.5,
        };
        let msg = err.to_string();
        assert!(msg.contains("t[3] = 9.5"), "{msg}");
        assert!(msg.contains("preceding value 10"), "{msg}");
    }

    #[test]
    fn test_invalid_period_message() {
        assert_eq!(
            Error::InvalidPeriod(0.0).to_string(),
            "period must be strictly positive and finite, got 0"
        );
    }
}
