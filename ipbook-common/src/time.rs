//! Timestamp utilities
//!
//! Every stored timestamp is a "civil" string: `YYYY-MM-DDTHH:mm:ss` at a fixed
//! +09:00 offset, with no offset suffix. Because the format is fixed-width and
//! zero-padded, lexicographic order equals chronological order.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

/// Hours added to an absolute instant to obtain civil time
pub const CIVIL_OFFSET_HOURS: i64 = 9;

/// chrono format string for civil timestamps
pub const CIVIL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as a civil timestamp string
pub fn civil_now() -> String {
    to_civil(now())
}

/// Render an absolute instant as a civil timestamp string
pub fn to_civil(instant: DateTime<Utc>) -> String {
    (instant + Duration::hours(CIVIL_OFFSET_HOURS))
        .format(CIVIL_FORMAT)
        .to_string()
}

/// Civil timestamp for an epoch-milliseconds value, if representable
pub fn civil_from_epoch_millis(millis: i64) -> Option<String> {
    DateTime::from_timestamp_millis(millis).map(to_civil)
}

/// Normalize a timestamp string to civil format.
///
/// Absolute ISO-8601 inputs (`Z` or `±hh:mm` suffix) are converted. Strings
/// with fractional seconds but no offset are read as UTC. Anything else,
/// including strings already in civil format, is returned unchanged, so the
/// function is idempotent.
pub fn normalize_civil(value: &str) -> String {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return to_civil(parsed.with_timezone(&Utc));
    }

    if value.contains('.') {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
            return to_civil(naive.and_utc());
        }
    }

    value.to_string()
}
