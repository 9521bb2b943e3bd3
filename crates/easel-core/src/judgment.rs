//! Judgment parsing: winner, score and reasoning from free text.
//!
//! `JudgmentParser::parse` is total. Malformed or empty judgments map to
//! fixed fallbacks:
//!
//! - winner: the **last** mention of a rendered candidate id wins, since the
//!   verdict follows the deliberation; with no mention the first rendered
//!   candidate is chosen and the result is marked `WinnerSource::Fallback`
//! - score: first `<n>/10`, otherwise unscored (`None`)
//! - reasoning: last non-empty paragraph, truncated; otherwise
//!   [`REASONING_PLACEHOLDER`]

use regex::Regex;

use crate::domain::error::{Result, StudioError};
use crate::domain::judgment::{JudgmentResult, WinnerSource};

/// Reasoning used when the judgment has no non-empty paragraph.
pub const REASONING_PLACEHOLDER: &str = "See full evaluation";

/// Extracts a [`JudgmentResult`] from raw judge output.
#[derive(Debug, Clone)]
pub struct JudgmentParser {
    id_pattern: Regex,
    score_pattern: Regex,
    paragraph_break: Regex,
    reasoning_max_chars: usize,
}

impl JudgmentParser {
    /// Parser for ids of the form `<prefix>_NNN`.
    pub fn new(id_prefix: &str, reasoning_max_chars: usize) -> Result<Self> {
        let build = |pattern: &str| {
            Regex::new(pattern).map_err(|e| StudioError::InvalidConfig(format!("bad pattern: {e}")))
        };
        Ok(Self {
            id_pattern: build(&format!(
                r"\b{}_\d{{3}}\b",
                regex::escape(&id_prefix.to_lowercase())
            ))?,
            score_pattern: build(r"(\d+)\s*/\s*10\b")?,
            paragraph_break: build(r"\n[ \t]*\n")?,
            reasoning_max_chars,
        })
    }

    /// Parse `raw` against the rendered ids (in batch order).
    ///
    /// The winner is always one of `candidate_ids`; with an empty id list it
    /// is the empty string.
    pub fn parse(&self, raw: &str, candidate_ids: &[String]) -> JudgmentResult {
        let (winner_id, winner_source) = match self.last_mentioned(raw, candidate_ids) {
            Some(id) => (id, WinnerSource::Matched),
            None => (
                candidate_ids.first().cloned().unwrap_or_default(),
                WinnerSource::Fallback,
            ),
        };

        JudgmentResult {
            winner_id,
            winner_source,
            score: self.score(raw),
            reasoning: self.reasoning(raw),
            evaluation: raw.to_string(),
        }
    }

    fn last_mentioned(&self, raw: &str, candidate_ids: &[String]) -> Option<String> {
        let lowered = raw.to_lowercase();
        let mentions: Vec<&str> = self
            .id_pattern
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .collect();

        mentions.iter().rev().find_map(|mention| {
            candidate_ids
                .iter()
                .find(|id| id.to_lowercase() == *mention)
                .cloned()
        })
    }

    fn score(&self, raw: &str) -> Option<u32> {
        self.score_pattern
            .captures(raw)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    fn reasoning(&self, raw: &str) -> String {
        let normalized = raw.replace("\r\n", "\n");
        self.paragraph_break
            .split(&normalized)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .last()
            .map(|p| p.chars().take(self.reasoning_max_chars).collect())
            .unwrap_or_else(|| REASONING_PLACEHOLDER.to_string())
    }
}
