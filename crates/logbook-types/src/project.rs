use serde::{Deserialize, Serialize};

/// Grouping key for sessions that belong to the same working directory.
///
/// Either authoritative (derived from an extracted working directory) or
/// provisional (derived from the log file's own containing directory when
/// extraction failed). The two cases are distinguished by comparing against
/// the containing-directory key, not by a separate flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectKey(String);

impl ProjectKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
