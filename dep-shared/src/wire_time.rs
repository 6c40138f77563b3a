//! The single date-time format used on the enrollment wire.
//!
//! Every timestamp (`orderDate`, `deliveryDate`) is rendered as UTC with second
//! precision and a literal `Z`, e.g. `2024-03-01T09:30:00Z`. Sub-second
//! precision is dropped on the way out.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

pub const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub fn format(value: &DateTime<Utc>) -> String {
    value.format(WIRE_FORMAT).to_string()
}

pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, WIRE_FORMAT).map(|naive| naive.and_utc())
}

/// Drop sub-second precision so a value survives a format/parse round trip.
pub fn truncate(value: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(value.timestamp(), 0).unwrap_or(value)
}

// serde `with = "wire_time"` helpers

pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format(value))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_is_utc_seconds_with_z() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        assert_eq!(format(&dt), "2024-03-01T09:30:00Z");
    }

    #[test]
    fn test_subseconds_are_dropped() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
            + chrono::Duration::milliseconds(750);

        assert_eq!(format(&dt), "2024-03-01T09:30:00Z");
        assert_eq!(parse(&format(&dt)).unwrap(), truncate(dt));
    }

    #[test]
    fn test_parse_rejects_offsets_and_garbage() {
        assert!(parse("2024-03-01T09:30:00+02:00").is_err());
        assert!(parse("01/03/2024").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn test_serde_helpers() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Stamp {
            #[serde(with = "crate::wire_time")]
            at: DateTime<Utc>,
        }

        let stamp = Stamp { at: Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap() };
        let json = serde_json::to_string(&stamp).unwrap();
        assert_eq!(json, r#"{"at":"2023-12-31T23:59:59Z"}"#);

        let back: Stamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back.at, stamp.at);
    }
}
