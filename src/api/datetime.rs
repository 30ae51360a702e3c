//! ISO-8601 handling for the `DATETIME` input and the `ds` output.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serializer};

const OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parses a combined date-time. Offsets are converted to UTC and dropped,
/// since the model's time axis is naive.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    for format in NAIVE_FORMATS {
        if let Ok(ds) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ds);
        }
    }

    if let Ok(ds) = DateTime::parse_from_rfc3339(raw) {
        return Some(ds.naive_utc());
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// `YYYY-MM-DDTHH:MM:SS`, with fractional seconds only when non-zero.
pub fn format_timestamp(ds: &NaiveDateTime) -> String {
    ds.format(OUTPUT_FORMAT).to_string()
}

pub fn serialize<S>(ds: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_timestamp(ds))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid ISO-8601 date-time '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::models::tests::ts;

    #[test]
    fn test_parse_accepted_forms() {
        let noon = ts(2024, 6, 1, 12);

        assert_eq!(parse_timestamp("2024-06-01T12:00:00"), Some(noon));
        assert_eq!(parse_timestamp("2024-06-01 12:00:00"), Some(noon));
        assert_eq!(parse_timestamp("2024-06-01T12:00"), Some(noon));
        assert_eq!(parse_timestamp("2024-06-01T14:00:00+02:00"), Some(noon));
        assert_eq!(parse_timestamp("2024-06-01T12:00:00Z"), Some(noon));
        assert_eq!(parse_timestamp("2024-06-01"), Some(ts(2024, 6, 1, 0)));
    }

    #[test]
    fn test_parse_keeps_fractional_seconds() {
        let ds = parse_timestamp("2024-06-01T12:00:00.250000").unwrap();
        assert_eq!(ds.and_utc().timestamp_subsec_millis(), 250);
        assert_eq!(format_timestamp(&ds), "2024-06-01T12:00:00.250");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_timestamp("not-a-date"), None);
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("2024-13-01T00:00:00"), None);
    }

    #[test]
    fn test_format_whole_seconds() {
        assert_eq!(format_timestamp(&ts(2024, 6, 1, 12)), "2024-06-01T12:00:00");
    }
}
