use crate::{Error, Result};
use std::path::PathBuf;

/// Resolve the state directory (cache tables, config) based on priority:
/// 1. Explicit path (with tilde expansion)
/// 2. LOGBOOK_PATH environment variable (with tilde expansion)
/// 3. XDG data directory (recommended default)
/// 4. ~/.logbook (fallback for systems without XDG)
pub fn resolve_state_dir(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var("LOGBOOK_PATH") {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(data_dir) = dirs::data_dir() {
        return Ok(data_dir.join("logbook"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".logbook"));
    }

    Err(Error::Config(
        "Could not determine state directory: no HOME directory or XDG data directory found"
            .to_string(),
    ))
}

/// Expand tilde (~) in paths to the user's home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let dir = resolve_state_dir(Some("/tmp/logbook-state")).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/logbook-state"));
    }

    #[test]
    fn tilde_expands_against_home() {
        if std::env::var_os("HOME").is_some() {
            let expanded = expand_tilde("~/logs");
            assert!(expanded.is_absolute());
            assert!(expanded.ends_with("logs"));
        }
    }
}
