use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::time::parse_timestamp_ms;

/// Log file naming convention: `<prefix>-<ISO-like-timestamp>-<id>.log`.
static FILENAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<prefix>[A-Za-z0-9_]+)-(?P<ts>\d{4}-\d{2}-\d{2}T\d{2}[-:]\d{2}[-:]\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:?\d{2})?)-(?P<id>.+)$",
    )
    .unwrap()
});

/// Parsed pieces of a conventionally-named log file. Fallback identity for
/// files whose header is missing or unreadable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileName {
    pub prefix: String,
    pub raw_timestamp: String,
    pub timestamp_ms: Option<i64>,
    pub id: String,
}

pub fn parse_log_file_name(path: &Path) -> Option<LogFileName> {
    let stem = path.file_stem()?.to_str()?;
    let captures = FILENAME_REGEX.captures(stem)?;

    let raw_timestamp = captures["ts"].to_string();
    Some(LogFileName {
        prefix: captures["prefix"].to_string(),
        timestamp_ms: parse_timestamp_ms(&raw_timestamp),
        raw_timestamp,
        id: captures["id"].to_string(),
    })
}
