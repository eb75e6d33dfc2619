use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Normalized, separator- and case-insensitive identity for a log file path.
///
/// Two paths that resolve to the same physical file must map to the same key,
/// regardless of how different callers spell them (separator style, casing,
/// redundant `.`/`..` components). Symlinks are resolved when the file still
/// exists; for paths that no longer resolve (deletion events) the key falls
/// back to a purely lexical normalization of the absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn from_path(path: &Path) -> Self {
        let resolved = path
            .canonicalize()
            .unwrap_or_else(|_| lexical_normalize(path));
        Self(normalize_text(&resolved.to_string_lossy()))
    }

    /// Build a key from an already-normalized string. Test/deserialization
    /// escape hatch; prefer [`CanonicalKey::from_path`].
    pub fn from_normalized(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Single separator style, lower-cased.
pub(crate) fn normalize_text(path: &str) -> String {
    path.replace('\\', "/").to_lowercase()
}

/// Resolve `.`/`..` components and make the path absolute without touching
/// the filesystem beyond the current-directory lookup.
pub(crate) fn lexical_normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_case_and_separator_insensitive() {
        let a = CanonicalKey(normalize_text(r"C:\Users\Dev\logs\2025\01\01\run-a.log"));
        let b = CanonicalKey(normalize_text("c:/users/dev/LOGS/2025/01/01/RUN-A.log"));
        assert_eq!(a, b);
    }

    #[test]
    fn redundant_components_collapse() {
        let spelled = Path::new("/tmp/roots/./2025/../2025/01/01/run-a.log");
        let plain = Path::new("/tmp/roots/2025/01/01/run-a.log");
        assert_eq!(
            CanonicalKey::from_path(spelled),
            CanonicalKey::from_path(plain)
        );
    }

    #[test]
    fn symlink_and_direct_path_share_a_key() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("run-a.log");
        std::fs::write(&target, "{}").unwrap();

        #[cfg(unix)]
        {
            let link = dir.path().join("alias.log");
            std::os::unix::fs::symlink(&target, &link).unwrap();
            assert_eq!(
                CanonicalKey::from_path(&target),
                CanonicalKey::from_path(&link)
            );
        }
    }
}
