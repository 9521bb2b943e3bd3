//! Parsed judge verdicts.

use serde::{Deserialize, Serialize};

/// How the winner id was chosen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WinnerSource {
    /// The id appeared in the judgment text.
    Matched,
    /// No rendered id appeared; the first rendered candidate was taken.
    Fallback,
}

/// Verdict extracted from one judgment text. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JudgmentResult {
    pub winner_id: String,
    pub winner_source: WinnerSource,

    /// `None` means the judgment carried no `<n>/10` score.
    pub score: Option<u32>,

    /// Last paragraph of the judgment, length bounded.
    pub reasoning: String,

    /// Full judgment text.
    pub evaluation: String,
}

impl JudgmentResult {
    /// Score for display: the number, or `N/A` when unscored.
    pub fn score_label(&self) -> String {
        match self.score {
            Some(score) => score.to_string(),
            None => "N/A".to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.winner_source == WinnerSource::Fallback
    }
}
