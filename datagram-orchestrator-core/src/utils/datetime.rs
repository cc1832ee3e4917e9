//! Datetime helpers.
//!
//! Serde support for persisted records:
//! - Serialization: `DateTime<Utc>` -> RFC3339 string
//! - Deserialization: RFC3339, activity-log style `YYYY-MM-DD HH:MM:SS` (UTC), or Unix seconds

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Activity log timestamp layout.
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Serializes `DateTime<Utc>` as an RFC3339 string.
pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&dt.to_rfc3339())
}

/// Deserializes `DateTime<Utc>` from any of the accepted layouts.
pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TimestampOrString {
        String(String),
        I64(i64),
    }

    match TimestampOrString::deserialize(deserializer)? {
        TimestampOrString::String(s) => parse_timestamp(&s)
            .ok_or_else(|| Error::custom(format!("Invalid timestamp: {s}"))),
        TimestampOrString::I64(ts) => {
            DateTime::from_timestamp(ts, 0).ok_or_else(|| Error::custom("Invalid Unix timestamp"))
        }
    }
}

/// Parses RFC3339 first, then the activity-log layout (interpreted as UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, LOG_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// `[YYYY-MM-DD HH:MM:SS] message`
pub fn format_log_line(at: DateTime<Utc>, message: &str) -> String {
    format!("[{}] {message}", at.format(LOG_TIMESTAMP_FORMAT))
}
