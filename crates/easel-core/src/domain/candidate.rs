//! Candidate sketches produced by the generation stage.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::{Result, StudioError};

/// One unit of generative work in a batch.
///
/// Created when generation returns, updated exactly once by the execution
/// stage (`with_artifact`), then read-only for the rest of the cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Candidate {
    /// Stable, lexically sortable id (`sketch_000`, `sketch_001`, ...).
    pub id: String,

    /// Short description that guided generation. Not unique.
    pub theme: String,

    /// Program text handed to the sandbox.
    pub source: String,

    /// Rendered image; only set after a successful execution.
    pub artifact_path: Option<PathBuf>,
}

impl Candidate {
    /// Create a freshly generated candidate (no artifact yet).
    pub fn new(id: impl Into<String>, theme: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            theme: theme.into(),
            source: source.into(),
            artifact_path: None,
        }
    }

    /// Format the id for slot `index` of a batch, e.g. `sketch_007`.
    pub fn format_id(prefix: &str, index: usize) -> String {
        format!("{prefix}_{index:03}")
    }

    /// Attach the rendered artifact.
    pub fn with_artifact(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifact_path = Some(path.into());
        self
    }

    /// Path of the rendered image, if the candidate rendered.
    pub fn artifact(&self) -> Option<&Path> {
        self.artifact_path.as_deref()
    }
}

/// Reduces a generator response to the program it contains.
#[derive(Debug, Clone)]
pub struct ProgramExtractor {
    fence: Regex,
}

impl ProgramExtractor {
    pub fn new() -> Result<Self> {
        let fence = Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n(.*?)```")
            .map_err(|e| StudioError::InvalidConfig(format!("bad pattern: {e}")))?;
        Ok(Self { fence })
    }

    /// Body of the first fenced code block when there is one, otherwise the
    /// whole text trimmed.
    pub fn extract(&self, text: &str) -> String {
        match self.fence.captures(text).and_then(|c| c.get(1)) {
            Some(body) => body.as_str().to_string(),
            None => text.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_id_is_zero_padded_and_sortable() {
        assert_eq!(Candidate::format_id("sketch", 0), "sketch_000");
        assert_eq!(Candidate::format_id("sketch", 12), "sketch_012");
        let mut ids: Vec<String> = [10, 2, 1].iter().map(|i| Candidate::format_id("sketch", *i)).collect();
        ids.sort();
        assert_eq!(ids, vec!["sketch_001", "sketch_002", "sketch_010"]);
    }

    #[test]
    fn test_with_artifact_sets_path_once() {
        let c = Candidate::new("sketch_000", "grid", "let surface = 1;");
        assert!(c.artifact().is_none());
        let c = c.with_artifact("/tmp/sketch_000.png");
        assert_eq!(c.artifact(), Some(Path::new("/tmp/sketch_000.png")));
    }

    fn extract_program(text: &str) -> String {
        ProgramExtractor::new().unwrap().extract(text)
    }

    #[test]
    fn test_extract_program_prefers_fenced_block() {
        let text = "Here you go:\n```rhai\nlet surface = new_surface(10, 10);\n```\nEnjoy.";
        assert_eq!(extract_program(text), "let surface = new_surface(10, 10);\n");
    }

    #[test]
    fn test_extract_program_untagged_fence() {
        let text = "```\nlet x = 1;\n```";
        assert_eq!(extract_program(text), "let x = 1;\n");
    }

    #[test]
    fn test_extract_program_without_fence_trims() {
        assert_eq!(extract_program("  let x = 1;  \n"), "let x = 1;");
    }

    #[test]
    fn test_extractor_is_reusable() {
        let extractor = ProgramExtractor::new().unwrap();
        assert_eq!(extractor.extract("```\na\n```"), "a\n");
        assert_eq!(extractor.extract("b"), "b");
        assert_eq!(extractor.extract("```rhai\nc\n``` and ```\nd\n```"), "c\n");
    }
}
