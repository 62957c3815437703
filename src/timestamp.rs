//! Parsing of provider timestamps.

use chrono::NaiveDateTime;
use thiserror::Error;

/// Formats the provider uses for timestamps, tried in order.
const FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.3fZ",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

/// Raised when a timestamp matches none of the known formats.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("could not parse date: {input}")]
pub struct TimestampError {
    /// Rejected input.
    pub input: String,
}

/// Parses a provider timestamp into milliseconds since the Unix epoch.
///
/// Timestamps carry no offset and are read as UTC. A missing or empty value
/// yields `0`.
///
/// # Errors
///
/// Returns [`TimestampError`] when the value matches no known format.
///
/// # Examples
///
/// ```
/// use tier3::timestamp::parse_timestamp;
///
/// assert_eq!(parse_timestamp(Some("1970-01-01T00:00:01.500Z")), Ok(1_500));
/// assert_eq!(parse_timestamp(None), Ok(0));
/// ```
pub fn parse_timestamp(value: Option<&str>) -> Result<i64, TimestampError> {
    let Some(text) = value.map(str::trim).filter(|text| !text.is_empty()) else {
        return Ok(0);
    };
    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|parsed| parsed.and_utc().timestamp_millis())
        .ok_or_else(|| TimestampError {
            input: text.to_owned(),
        })
}
