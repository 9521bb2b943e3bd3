//! Preference ledger: the append-only history of past winners.
//!
//! The judge reads the whole history as free text, so entries are stored as
//! markdown blocks. Entries are only ever appended; nothing rewrites or
//! truncates the file.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::domain::candidate::Candidate;
use crate::domain::error::LedgerError;
use crate::domain::judgment::JudgmentResult;
use crate::domain::period::Period;

/// Result type for ledger operations.
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// History returned while no winner has been recorded yet.
pub const SEED_HISTORY: &str =
    "No preferences learned yet. Building taste profile from selections.";

/// One recorded winner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEntry {
    pub date: NaiveDate,
    pub period: u8,
    pub winner_id: String,
    pub theme: String,
    pub score: Option<u32>,
    pub reasoning: String,
}

impl LedgerEntry {
    /// Entry for the promoted winner of a cycle.
    pub fn for_winner(period: &Period, winner: &Candidate, judgment: &JudgmentResult) -> Self {
        Self {
            date: period.date,
            period: period.number,
            winner_id: winner.id.clone(),
            theme: winner.theme.clone(),
            score: judgment.score,
            reasoning: judgment.reasoning.clone(),
        }
    }

    /// Markdown block appended to the ledger.
    pub fn render(&self) -> String {
        let score = self
            .score
            .map(|s| format!("{s}/10"))
            .unwrap_or_else(|| "N/A".to_string());
        format!(
            "\n## {} - Period {} Selection\n\n\
             **Selected**: {}  \n\
             **Theme**: {}  \n\
             **Score**: {}  \n\
             **Reasoning**: {}\n\n\
             ---\n",
            self.date, self.period, self.winner_id, self.theme, score, self.reasoning
        )
    }
}

/// Append-only store of past winners.
#[async_trait]
pub trait PreferenceLedger: Send + Sync {
    /// Append one entry. Existing content is never modified.
    async fn append(&self, entry: &LedgerEntry) -> LedgerResult<()>;

    /// Full history as text, or [`SEED_HISTORY`] when empty.
    async fn read_all(&self) -> LedgerResult<String>;
}

/// Ledger stored as a single markdown file.
#[derive(Debug, Clone)]
pub struct FileLedger {
    path: PathBuf,
}

impl FileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PreferenceLedger for FileLedger {
    async fn append(&self, entry: &LedgerEntry) -> LedgerResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(entry.render().as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn read_all(&self) -> LedgerResult<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) if !text.trim().is_empty() => Ok(text),
            Ok(_) => Ok(SEED_HISTORY.to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SEED_HISTORY.to_string()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, score: Option<u32>) -> LedgerEntry {
        LedgerEntry {
            date: NaiveDate::from_ymd_opt(2026, 1, 24).unwrap(),
            period: 3,
            winner_id: id.to_string(),
            theme: "Lissajous curves".to_string(),
            score,
            reasoning: "Balanced rhythm.".to_string(),
        }
    }

    #[test]
    fn test_render_contains_fields() {
        let text = entry("sketch_003", Some(8)).render();
        assert!(text.contains("## 2026-01-24 - Period 3 Selection"));
        assert!(text.contains("**Selected**: sketch_003"));
        assert!(text.contains("**Theme**: Lissajous curves"));
        assert!(text.contains("**Score**: 8/10"));
        assert!(text.contains("**Reasoning**: Balanced rhythm."));
        assert!(text.ends_with("---\n"));
    }

    #[test]
    fn test_render_unscored() {
        assert!(entry("sketch_000", None).render().contains("**Score**: N/A  \n"));
    }

    #[tokio::test]
    async fn test_missing_file_reads_seed() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileLedger::new(dir.path().join("taste_profile.md"));
        assert_eq!(ledger.read_all().await.unwrap(), SEED_HISTORY);
    }

    #[tokio::test]
    async fn test_append_creates_parent_and_keeps_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = FileLedger::new(dir.path().join("state").join("taste_profile.md"));

        ledger.append(&entry("sketch_001", Some(7))).await.unwrap();
        let first = ledger.read_all().await.unwrap();

        ledger.append(&entry("sketch_004", None)).await.unwrap();
        let second = ledger.read_all().await.unwrap();

        assert!(second.starts_with(&first));
        assert_eq!(second.matches("## ").count(), 2);
        assert!(second.find("sketch_001").unwrap() < second.find("sketch_004").unwrap());
    }
}
