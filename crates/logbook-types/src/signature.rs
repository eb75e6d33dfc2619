use serde::{Deserialize, Serialize};

/// Cheap per-file change fingerprint.
///
/// Two signatures are equal iff both fields match exactly. This is the sole
/// gate for "needs re-parse" decisions; file content is never compared
/// directly (hashing would be correct but too expensive for large trees).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSignature {
    /// Modification time in milliseconds since the Unix epoch.
    pub mtime_ms: i64,
    /// File size in bytes.
    pub size: u64,
}

impl FileSignature {
    pub fn new(mtime_ms: i64, size: u64) -> Self {
        Self { mtime_ms, size }
    }
}
