// Local configuration for the collaboration engine.
//
// Global config: `~/.draftsync/config.toml`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::suggestions::DEFAULT_SUGGESTION_CAP;

/// Root directory for DraftSync global state: `~/.draftsync/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".draftsync"))
}

/// Path to the global config file: `~/.draftsync/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("config.toml"))
}

/// Global engine configuration at `~/.draftsync/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default display name for this user.
    pub display_name: Option<String>,
    /// How many recent AI suggestions each session retains.
    pub suggestion_cap: usize,
    /// Insights service settings.
    pub insights: InsightsConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            display_name: None,
            suggestion_cap: DEFAULT_SUGGESTION_CAP,
            insights: InsightsConfig::default(),
        }
    }
}

/// Settings for the external AI insights service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InsightsConfig {
    /// Base URL (e.g. `https://insights.example.com`).
    pub base_url: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self { base_url: None, timeout_secs: 10 }
    }
}

impl GlobalConfig {
    /// Load from `~/.draftsync/config.toml`. Returns defaults if the file
    /// doesn't exist or can't be parsed.
    pub fn load() -> Self {
        global_config_path().and_then(|p| Self::load_from(&p).ok()).unwrap_or_default()
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config at {}", path.display()))
    }

    /// Write to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let raw = toml::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(path, raw)
            .with_context(|| format!("failed to write config at {}", path.display()))
    }
}
