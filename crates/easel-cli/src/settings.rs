//! Studio configuration file (`easel.toml`).
//!
//! Every section is optional; missing keys fall back to their defaults.
//! Secrets never come from the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use easel_agents::{DisplayConfig, GalleryConfig, LlmConfig, StatusConfig};
use easel_core::StudioConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "easel.toml";

/// `[ledger]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LedgerConfig {
    pub path: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("taste_profile.md"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub studio: StudioConfig,
    pub llm: LlmConfig,
    pub gallery: GalleryConfig,
    pub display: DisplayConfig,
    pub status: StatusConfig,
    pub ledger: LedgerConfig,
}

impl Settings {
    pub fn from_toml(text: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(text).context("invalid studio config")?;
        settings.studio.validate()?;
        Ok(settings)
    }

    /// Load `path`; a missing default file means all defaults.
    pub fn load(path: &Path, explicit: bool) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !explicit => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to render config")
    }
}
