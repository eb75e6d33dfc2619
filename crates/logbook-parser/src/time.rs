use chrono::{DateTime, NaiveDateTime};

/// Parse an ISO-like timestamp into epoch milliseconds.
///
/// Accepts RFC 3339, the naive `YYYY-MM-DDTHH:MM:SS[.fff]` form (assumed
/// UTC), and the filename-safe variant with dashes in the time portion.
pub(crate) fn parse_timestamp_ms(raw: &str) -> Option<i64> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H-%M-%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }

    None
}
