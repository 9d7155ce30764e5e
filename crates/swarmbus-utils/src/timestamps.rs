//! ISO-8601 UTC timestamp helpers used by healing and canonicalization.

use chrono::{DateTime, SecondsFormat, Utc};

/// Current instant, formatted as ISO-8601 UTC with second precision.
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a string as an ISO-8601 / RFC 3339 UTC timestamp.
pub fn parse_iso8601(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// True if `value` parses as an ISO-8601 UTC timestamp.
pub fn is_iso8601(value: &str) -> bool {
    parse_iso8601(value).is_some()
}
