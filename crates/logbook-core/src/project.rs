use logbook_types::ProjectKey;
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::canonical::{lexical_normalize, normalize_text};

/// Derive the grouping key for an extracted working directory.
///
/// The directory text is normalized the same way [`crate::CanonicalKey`]
/// normalizes file paths before hashing, so differently-spelled mentions of
/// one directory collapse to one key.
pub fn project_key_from_cwd(working_dir: &str) -> ProjectKey {
    hash_key(&normalize_text(working_dir.trim().trim_end_matches(['/', '\\'])))
}

/// Fallback grouping key: the log file's own containing directory.
///
/// A summary whose key equals this value is provisional; the retry scheduler
/// exists to promote it once the working directory shows up in the log.
pub fn project_key_from_dir(log_path: &Path) -> ProjectKey {
    let parent = log_path.parent().unwrap_or(log_path);
    let resolved = parent
        .canonicalize()
        .unwrap_or_else(|_| lexical_normalize(parent));
    hash_key(&normalize_text(&resolved.to_string_lossy()))
}

fn hash_key(normalized: &str) -> ProjectKey {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    ProjectKey::new(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cwd_key_collapses_spellings() {
        let a = project_key_from_cwd("/home/dev/Project");
        let b = project_key_from_cwd("/home/dev/project/");
        let c = project_key_from_cwd(r"\home\dev\project");
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn dir_key_differs_from_unrelated_cwd_key() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("run-a.log");
        std::fs::write(&log, "{}").unwrap();

        let provisional = project_key_from_dir(&log);
        assert_ne!(provisional, project_key_from_cwd("/home/dev/project"));
        // Stable across calls.
        assert_eq!(provisional, project_key_from_dir(&log));
    }
}
