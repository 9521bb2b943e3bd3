//! Static configuration handed to the orchestrator at construction.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::error::{Result, StudioError};

/// Built-in themes, cycled through when generating a batch.
pub const DEFAULT_THEMES: &[&str] = &[
    "Perlin noise flow field with particle trails creating organic movement",
    "Polar coordinate transformation of Swiss grid with radial distortion",
    "Voronoi tessellation with gradient color transitions between cells",
    "Recursive geometric subdivision using golden ratio proportions",
    "Moire interference from two slowly rotating angular grids",
    "Isometric crystal lattice structure with simulated depth and shadows",
    "Reaction-diffusion pattern rendered in stark black and white",
    "Truchet tiles arranged with multi-layer transparency effects",
    "Penrose tiling with subtle hue shifts across the composition",
    "Fractal branching structure constrained to geometric forms",
    "Fibonacci spiral with modulated line weights and spacing",
    "Lissajous curves with harmonically related frequencies",
    "Parametric surface projection onto 2D plane with contour lines",
    "Delaunay triangulation with color-coded triangle areas",
    "Bezier curve network forming organic yet systematic patterns",
];

/// Largest batch whose ids still fit the three-digit `<prefix>_NNN` form.
pub const MAX_CANDIDATES: usize = 1000;

/// What to do when the judgment text names none of the rendered candidates.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WinnerFallback {
    /// Promote the first rendered candidate (batch order).
    #[default]
    FirstCandidate,
    /// Skip promotion and end the cycle as aborted.
    Abort,
}

/// Configuration for one orchestration cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StudioConfig {
    /// Number of candidates requested per cycle (N).
    pub candidate_count: usize,

    /// Wall-clock limit for a single candidate execution (milliseconds).
    pub deadline_ms: u64,

    /// Root of the per-cycle output tree (`<root>/<date>/period_<n>/`).
    pub output_root: PathBuf,

    /// Themes cycled across the batch.
    pub themes: Vec<String>,

    /// Candidates executed at the same time (1 = sequential).
    pub max_parallel: usize,

    /// Candidate id prefix; ids look like `<prefix>_007`.
    pub id_prefix: String,

    /// Maximum characters of reasoning kept from a judgment.
    pub reasoning_max_chars: usize,

    pub winner_fallback: WinnerFallback,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            candidate_count: 8,
            deadline_ms: 10_000,
            output_root: PathBuf::from("output"),
            themes: DEFAULT_THEMES.iter().map(|t| t.to_string()).collect(),
            max_parallel: 1,
            id_prefix: "sketch".to_string(),
            reasoning_max_chars: 200,
            winner_fallback: WinnerFallback::FirstCandidate,
        }
    }
}

impl StudioConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    /// Reject configurations the orchestrator cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.candidate_count == 0 {
            return Err(StudioError::InvalidConfig(
                "candidate_count must be at least 1".to_string(),
            ));
        }
        if self.candidate_count > MAX_CANDIDATES {
            return Err(StudioError::InvalidConfig(format!(
                "candidate_count must be at most {MAX_CANDIDATES}, got {}",
                self.candidate_count
            )));
        }
        if self.deadline_ms == 0 {
            return Err(StudioError::InvalidConfig(
                "deadline_ms must be greater than 0".to_string(),
            ));
        }
        if self.themes.is_empty() {
            return Err(StudioError::InvalidConfig(
                "themes cannot be empty".to_string(),
            ));
        }
        if self.max_parallel == 0 {
            return Err(StudioError::InvalidConfig(
                "max_parallel must be at least 1".to_string(),
            ));
        }
        // Judgment text is matched lowercased, so the prefix must be lowercase too.
        let prefix_ok = !self.id_prefix.is_empty()
            && self
                .id_prefix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !prefix_ok {
            return Err(StudioError::InvalidConfig(format!(
                "id_prefix must be lowercase ascii, got {:?}",
                self.id_prefix
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = StudioConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.candidate_count, 8);
        assert_eq!(config.deadline(), Duration::from_secs(10));
        assert_eq!(config.themes.len(), 15);
    }

    #[test]
    fn test_candidate_count_is_capped_at_three_digit_ids() {
        let largest = StudioConfig {
            candidate_count: MAX_CANDIDATES,
            ..StudioConfig::default()
        };
        assert!(largest.validate().is_ok());

        let too_many = StudioConfig {
            candidate_count: MAX_CANDIDATES + 1,
            ..StudioConfig::default()
        };
        let err = too_many.validate().unwrap_err();
        assert!(err.to_string().contains("at most 1000"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero = StudioConfig {
            candidate_count: 0,
            ..StudioConfig::default()
        };
        assert!(zero.validate().is_err());

        let no_themes = StudioConfig {
            themes: vec![],
            ..StudioConfig::default()
        };
        assert!(no_themes.validate().is_err());

        let upper = StudioConfig {
            id_prefix: "Sketch".to_string(),
            ..StudioConfig::default()
        };
        let err = upper.validate().unwrap_err();
        assert!(err.to_string().contains("id_prefix"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: StudioConfig =
            toml::from_str("candidate_count = 3\nwinner_fallback = \"abort\"\n").unwrap();
        assert_eq!(config.candidate_count, 3);
        assert_eq!(config.winner_fallback, WinnerFallback::Abort);
        assert_eq!(config.deadline_ms, 10_000);
        assert_eq!(config.id_prefix, "sketch");
    }
}
