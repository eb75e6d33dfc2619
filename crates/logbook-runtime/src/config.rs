use anyhow::Result;
use logbook_core::expand_tilde;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Persisted runtime configuration: which log roots to index on top of the
/// auto-detected agent-CLI directories.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub roots: Vec<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::default_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(logbook_core::resolve_state_dir(None)?.join("config.toml"))
    }

    /// Known agent-CLI session log directories present on this machine, plus
    /// anything listed in `LOGBOOK_EXTRA_ROOTS` (colon-separated).
    pub fn detect_roots() -> Vec<PathBuf> {
        let mut roots = Vec::new();

        if let Some(home) = dirs::home_dir() {
            for candidate in [
                home.join(".codex").join("sessions"),
                home.join(".logbook").join("sessions"),
            ] {
                if candidate.is_dir() {
                    roots.push(candidate);
                }
            }
        }

        if let Ok(extra) = std::env::var("LOGBOOK_EXTRA_ROOTS") {
            for part in extra.split(':').filter(|p| !p.trim().is_empty()) {
                roots.push(expand_tilde(part.trim()));
            }
        }

        roots
    }

    /// Configured roots merged with detection, first occurrence wins.
    pub fn effective_roots(&self) -> Vec<PathBuf> {
        let mut roots = self.roots.clone();
        for detected in Self::detect_roots() {
            if !roots.contains(&detected) {
                roots.push(detected);
            }
        }
        roots
    }
}
