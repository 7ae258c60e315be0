//! Lenient timestamp parsing for upstream payloads.
//!
//! The upstream issue tracker emits timestamps in whichever of a handful of
//! formats its own serializer happens to pick, and sometimes emits `null`.
//! `FlexibleTimestamp` accepts all of them and never fails to deserialize:
//! a `null` or unparseable value decodes to the Unix epoch rather than
//! erroring the whole payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

const FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.3f%z",
    "%Y-%m-%dT%H:%M:%S%.3f%#z",
    "%+",
];

/// A timestamp that deserializes from any of the upstream's known formats,
/// falling back to the Unix epoch instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FlexibleTimestamp(pub DateTime<Utc>);

impl FlexibleTimestamp {
    pub fn epoch() -> Self {
        FlexibleTimestamp(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Parse a raw upstream string, returning the epoch on any failure
    /// instead of an error (mirrors the upstream's own tolerant decoder).
    pub fn parse_lenient(raw: &str) -> Self {
        let trimmed = raw.trim_matches('"');

        if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
            return FlexibleTimestamp(parsed.with_timezone(&Utc));
        }

        for format in FORMATS {
            if let Ok(parsed) = DateTime::parse_from_str(trimmed, format) {
                return FlexibleTimestamp(parsed.with_timezone(&Utc));
            }
        }

        FlexibleTimestamp::epoch()
    }
}

impl Default for FlexibleTimestamp {
    fn default() -> Self {
        FlexibleTimestamp::epoch()
    }
}

impl From<DateTime<Utc>> for FlexibleTimestamp {
    fn from(value: DateTime<Utc>) -> Self {
        FlexibleTimestamp(value)
    }
}

impl From<FlexibleTimestamp> for DateTime<Utc> {
    fn from(value: FlexibleTimestamp) -> Self {
        value.0
    }
}

impl fmt::Display for FlexibleTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for FlexibleTimestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(match raw {
            Some(s) if !s.is_empty() => FlexibleTimestamp::parse_lenient(&s),
            _ => FlexibleTimestamp::epoch(),
        })
    }
}

/// Helper for `#[serde(serialize_with = "...")]` callers who want a plain
/// RFC3339 string rather than the transparent newtype encoding.
pub fn serialize_rfc3339<S>(ts: &FlexibleTimestamp, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&ts.0.to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_offset_with_millis_and_numeric_zone() {
        let ts = FlexibleTimestamp::parse_lenient("2024-01-15T10:30:00.000-0700");
        assert_eq!(ts.0.timestamp(), 1705336200);
    }

    #[test]
    fn parses_offset_with_millis_and_zulu_zone() {
        let ts = FlexibleTimestamp::parse_lenient("2024-01-15T10:30:00.000+0000");
        assert_eq!(ts.0.timestamp(), 1705314600);
    }

    #[test]
    fn parses_rfc3339() {
        let ts = FlexibleTimestamp::parse_lenient("2024-01-15T10:30:00Z");
        assert_eq!(ts.0.timestamp(), 1705314600);
    }

    #[test]
    fn null_yields_epoch_without_error() {
        let parsed: FlexibleTimestamp = serde_json::from_str("null").unwrap();
        assert_eq!(parsed, FlexibleTimestamp::epoch());
    }

    #[test]
    fn garbage_yields_epoch_without_error() {
        let ts = FlexibleTimestamp::parse_lenient("not-a-timestamp");
        assert_eq!(ts, FlexibleTimestamp::epoch());
    }

    #[test]
    fn round_trip_within_a_second() {
        let original = "2024-01-15T10:30:00.123+0000";
        let ts = FlexibleTimestamp::parse_lenient(original);
        let rendered = ts.to_string();
        let reparsed = FlexibleTimestamp::parse_lenient(&rendered);
        assert!((ts.0 - reparsed.0).num_milliseconds().abs() < 1000);
    }
}
