/// Core data types for the Chemnitz air quality service.
///
/// This module defines the shared domain model imported by all other modules:
/// the fetched snapshot, the per-pollutant reading decoded from it, the
/// rendered report, and the error types for each stage of a run.
/// It contains no I/O.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::alert::thresholds::Severity;

// ---------------------------------------------------------------------------
// Snapshot layout
// ---------------------------------------------------------------------------

/// Number of leading positional entries in a snapshot that are metadata
/// (end-of-interval timestamp, overall index, incomplete flag), not readings.
pub const SNAPSHOT_METADATA_ENTRIES: usize = 3;

/// Tuple positions inside one reading entry: `[id, value, index, "decimal"]`.
const ENTRY_POLLUTANT_ID: usize = 0;
const ENTRY_SEVERITY: usize = 2;
const ENTRY_VALUE: usize = 3;

// ---------------------------------------------------------------------------
// Snapshot and reading types
// ---------------------------------------------------------------------------

/// All readings the UBA API reported for one station at one timestamp.
///
/// `entries` is kept positional, exactly as supplied by the feed. The first
/// `SNAPSHOT_METADATA_ENTRIES` positions are metadata; readings follow.
#[derive(Debug, Clone, PartialEq)]
pub struct StationSnapshot {
    pub station_id: String,
    /// Map key the API used for this snapshot (start of the interval).
    pub key: String,
    /// End of the measurement interval, as a UTC instant.
    pub timestamp: DateTime<Utc>,
    pub entries: Vec<Value>,
}

impl StationSnapshot {
    /// Positional entries after the metadata slots.
    pub fn reading_entries(&self) -> &[Value] {
        self.entries
            .get(SNAPSHOT_METADATA_ENTRIES..)
            .unwrap_or_default()
    }
}

/// One pollutant's measurement within a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub pollutant_id: u32,
    /// Raw index code from the feed; `None` if it was not an integer.
    pub severity_code: Option<i64>,
    /// Raw value as supplied. May be a number, a numeric string, or junk.
    pub value: Value,
}

impl Reading {
    /// Decodes a `[id, value, index, "decimal"]` tuple.
    pub fn from_entry(entry: &Value) -> Result<Reading, DataError> {
        let tuple = entry
            .as_array()
            .ok_or_else(|| DataError::MalformedEntry(entry.to_string()))?;

        let pollutant_id = tuple
            .get(ENTRY_POLLUTANT_ID)
            .and_then(integer_of)
            .and_then(|id| u32::try_from(id).ok())
            .ok_or_else(|| DataError::MalformedEntry(entry.to_string()))?;

        let severity_code = tuple.get(ENTRY_SEVERITY).and_then(integer_of);

        let value = tuple
            .get(ENTRY_VALUE)
            .cloned()
            .ok_or_else(|| DataError::MalformedEntry(entry.to_string()))?;

        Ok(Reading {
            pollutant_id,
            severity_code,
            value,
        })
    }

    /// The measurement as a float, from a JSON number or a string that
    /// starts with one. Trailing text after the number is ignored, so
    /// `"12.3 µg"` reads as 12.3 while `"n/a"` is an error.
    pub fn numeric_value(&self) -> Result<f64, DataError> {
        let parsed = match &self.value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => leading_number(s),
            _ => None,
        };

        match parsed {
            Some(v) if v.is_finite() => Ok(v),
            _ => Err(DataError::NonNumericValue {
                pollutant_id: self.pollutant_id,
                raw: self.value.to_string(),
            }),
        }
    }
}

/// Longest decimal prefix of `raw` after leading whitespace:
/// `[+-]digits[.digits][(e|E)[+-]digits]`.
fn leading_number(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let int_end = digits_from(end);
    let mut mantissa_digits = int_end - end;
    end = int_end;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        mantissa_digits += frac_end - (end + 1);
        end = frac_end;
    }
    if mantissa_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    s[..end].parse().ok()
}

/// Integer from a JSON number or a string holding one.
fn integer_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Rendered report for one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub text: String,
    /// True when the report should be published.
    pub alert: bool,
    /// Highest severity among rendered entries, `None` if nothing rendered.
    pub worst: Option<Severity>,
    /// Number of entries dropped as data errors.
    pub skipped: usize,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching or decoding UBA air quality data.
#[derive(Debug, Clone, PartialEq)]
pub enum UbaError {
    /// The request never produced a response (DNS, TLS, timeout, ...).
    Transport(String),
    /// Non-2xx HTTP response from the UBA API.
    HttpError(u16),
    /// The response body could not be deserialized.
    ParseError(String),
    /// The requested station was not present in the response.
    StationNotFound(String),
    /// The station was present but had no usable snapshot.
    NoDataAvailable(String),
}

impl std::fmt::Display for UbaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UbaError::Transport(msg) => write!(f, "Transport error: {}", msg),
            UbaError::HttpError(code) => write!(f, "HTTP error: {}", code),
            UbaError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            UbaError::StationNotFound(station) => write!(f, "Station not found: {}", station),
            UbaError::NoDataAvailable(station) => {
                write!(f, "No data available for station: {}", station)
            }
        }
    }
}

impl std::error::Error for UbaError {}

/// A single snapshot entry that cannot be rendered. Skips the entry only.
#[derive(Debug, Clone, PartialEq)]
pub enum DataError {
    /// The entry is not a `[id, value, index, ...]` tuple.
    MalformedEntry(String),
    /// The pollutant id has no catalog row.
    UnknownPollutant(u32),
    /// The value field is not a number.
    NonNumericValue { pollutant_id: u32, raw: String },
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::MalformedEntry(raw) => write!(f, "Malformed entry: {}", raw),
            DataError::UnknownPollutant(id) => write!(f, "Unknown pollutant id: {}", id),
            DataError::NonNumericValue { pollutant_id, raw } => {
                write!(f, "Non-numeric value for pollutant {}: {}", pollutant_id, raw)
            }
        }
    }
}

impl std::error::Error for DataError {}

/// Errors from the Bluesky publish step. None of these abort the run.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishError {
    /// A required environment variable is unset or empty.
    MissingConfig(&'static str),
    /// The service rejected the handle/password pair.
    AuthError(String),
    Transport(String),
    HttpError(u16),
    ParseError(String),
    /// Post text exceeds the service limit.
    PostTooLong { chars: usize, limit: usize },
}

impl std::fmt::Display for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishError::MissingConfig(var) => {
                write!(f, "Missing configuration: {} is not set", var)
            }
            PublishError::AuthError(msg) => write!(f, "Authentication failed: {}", msg),
            PublishError::Transport(msg) => write!(f, "Transport error: {}", msg),
            PublishError::HttpError(code) => write!(f, "HTTP error: {}", code),
            PublishError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            PublishError::PostTooLong { chars, limit } => {
                write!(f, "Post too long: {} characters (limit {})", chars, limit)
            }
        }
    }
}

impl std::error::Error for PublishError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reading_decodes_uba_tuple() {
        let reading = Reading::from_entry(&json!([1, 42, 0, "42.5"])).unwrap();
        assert_eq!(reading.pollutant_id, 1);
        assert_eq!(reading.severity_code, Some(0));
        assert_eq!(reading.numeric_value(), Ok(42.5));
    }

    #[test]
    fn test_reading_accepts_string_id_and_severity() {
        let reading = Reading::from_entry(&json!(["5", 20, "2", 19.8])).unwrap();
        assert_eq!(reading.pollutant_id, 5);
        assert_eq!(reading.severity_code, Some(2));
        assert_eq!(reading.numeric_value(), Ok(19.8));
    }

    #[test]
    fn test_reading_rejects_non_tuple() {
        let result = Reading::from_entry(&json!("2024-05-01 09:00:00"));
        assert!(matches!(result, Err(DataError::MalformedEntry(_))));
    }

    #[test]
    fn test_reading_rejects_short_tuple() {
        let result = Reading::from_entry(&json!([1, 42]));
        assert!(matches!(result, Err(DataError::MalformedEntry(_))));
    }

    #[test]
    fn test_non_numeric_value_is_data_error() {
        let reading = Reading::from_entry(&json!([1, null, 0, "n/a"])).unwrap();
        assert_eq!(
            reading.numeric_value(),
            Err(DataError::NonNumericValue {
                pollutant_id: 1,
                raw: "\"n/a\"".to_string(),
            })
        );
    }

    #[test]
    fn test_value_with_trailing_unit_reads_leading_number() {
        let reading = Reading::from_entry(&json!([1, 12, 0, "12.3 µg"])).unwrap();
        assert_eq!(reading.numeric_value(), Ok(12.3));
    }

    #[test]
    fn test_leading_number_prefixes() {
        assert_eq!(leading_number(" 42"), Some(42.0));
        assert_eq!(leading_number("-.5x"), Some(-0.5));
        assert_eq!(leading_number("7."), Some(7.0));
        assert_eq!(leading_number("1.5e2 ppm"), Some(150.0));
        assert_eq!(leading_number("3e"), Some(3.0));
        assert_eq!(leading_number("3e+"), Some(3.0));
        assert_eq!(leading_number("18,4"), Some(18.0));
        assert_eq!(leading_number("abc"), None);
        assert_eq!(leading_number("-"), None);
        assert_eq!(leading_number("."), None);
        assert_eq!(leading_number(""), None);
    }

    #[test]
    fn test_overflowing_value_is_data_error() {
        let reading = Reading::from_entry(&json!([1, 1, 0, "1e999"])).unwrap();
        assert!(matches!(reading.numeric_value(), Err(DataError::NonNumericValue { .. })));
    }

    #[test]
    fn test_null_value_is_data_error() {
        let reading = Reading::from_entry(&json!([3, null, 1, null])).unwrap();
        assert!(reading.numeric_value().is_err());
    }

    #[test]
    fn test_unparseable_severity_is_none() {
        let reading = Reading::from_entry(&json!([1, 42, "high", "42"])).unwrap();
        assert_eq!(reading.severity_code, None);
    }

    #[test]
    fn test_reading_entries_skips_metadata() {
        let snapshot = StationSnapshot {
            station_id: "1671".to_string(),
            key: "2024-05-01 08:00:00".to_string(),
            timestamp: chrono::Utc::now(),
            entries: vec![
                json!("2024-05-01 09:00:00"),
                json!(1),
                json!(0),
                json!([1, 42, 0, "42.5"]),
            ],
        };
        assert_eq!(snapshot.reading_entries(), &[json!([1, 42, 0, "42.5"])]);
    }

    #[test]
    fn test_reading_entries_of_short_snapshot_is_empty() {
        let snapshot = StationSnapshot {
            station_id: "1671".to_string(),
            key: String::new(),
            timestamp: chrono::Utc::now(),
            entries: vec![json!("2024-05-01 09:00:00")],
        };
        assert!(snapshot.reading_entries().is_empty());
    }
}
