//! Configuration for the collaborator implementations.
//!
//! Each struct maps to one section of the studio TOML file and fills in
//! defaults for anything left out.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_API_VERSION: &str = "2023-06-01";

/// `[llm]`: the messages API used for generation and judging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub endpoint: String,
    pub api_version: String,
    pub generator_model: String,
    pub judge_model: String,
    pub generator_max_tokens: u32,
    pub judge_max_tokens: u32,
    /// Sampling temperature for generation. Judging always uses the API
    /// default.
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Optional creative brief prepended to every generation prompt.
    pub brief: Option<String>,
    /// Never read from the file; supplied via the environment.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            generator_model: "claude-3-5-haiku-latest".to_string(),
            judge_model: "claude-sonnet-4-20250514".to_string(),
            generator_max_tokens: 4096,
            judge_max_tokens: 4096,
            temperature: 1.0,
            timeout_secs: 120,
            brief: None,
            api_key: None,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

/// `[gallery]`: where winners are published.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GalleryConfig {
    /// Directory holding `<date>/period_<n>.*`.
    pub root: PathBuf,
    /// Commit the new files into the enclosing git repository.
    pub commit: bool,
    /// Pull before and push after committing.
    pub sync_remote: bool,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("gallery/public/gallery"),
            commit: true,
            sync_remote: true,
        }
    }
}

/// `[display]`: the local frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub enabled: bool,
    /// File the current frame is written to.
    pub frame_path: PathBuf,
    /// Command run after the frame changes, e.g. `["pkill", "-HUP", "feh"]`.
    pub refresh_command: Vec<String>,
    pub refresh_timeout_secs: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            frame_path: PathBuf::from("/tmp/current_display.png"),
            refresh_command: Vec::new(),
            refresh_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// Trace only.
    #[default]
    Log,
    /// Overwrite a local JSON file.
    File,
    /// PUT the JSON document to an HTTP endpoint.
    Http,
}

/// `[status]`: where stage progress goes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StatusConfig {
    pub kind: StatusKind,
    pub path: PathBuf,
    pub url: Option<String>,
    pub timeout_secs: u64,
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            kind: StatusKind::Log,
            path: PathBuf::from("status.json"),
            url: None,
            timeout_secs: 10,
            token: None,
        }
    }
}
