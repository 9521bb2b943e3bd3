//! In-memory fakes for the collaborator traits (testing only).
//!
//! Each fake records what it was asked to do so tests can assert on call
//! counts and arguments without any network or git access.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::collaborator::*;
use crate::domain::error::{GenerationError, JudgingError, LedgerError, PromotionError};
use crate::ledger::{LedgerEntry, LedgerResult, PreferenceLedger, SEED_HISTORY};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// ScriptedGenerator
// ---------------------------------------------------------------------------

/// Generator that answers every slot with a fixed program, with per-slot
/// overrides and failures.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    default_program: String,
    overrides: HashMap<usize, Option<String>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new(default_program: impl Into<String>) -> Self {
        Self {
            default_program: default_program.into(),
            ..Self::default()
        }
    }

    /// Answer slot `index` with `text` instead of the default.
    pub fn with_response(mut self, index: usize, text: impl Into<String>) -> Self {
        self.overrides.insert(index, Some(text.into()));
        self
    }

    /// Make the request for slot `index` fail.
    pub fn failing(mut self, index: usize) -> Self {
        self.overrides.insert(index, None);
        self
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        lock(&self.requests).clone()
    }

    pub fn calls(&self) -> usize {
        lock(&self.requests).len()
    }
}

#[async_trait]
impl SketchGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        lock(&self.requests).push(request.clone());
        match self.overrides.get(&request.index) {
            Some(Some(text)) => Ok(text.clone()),
            Some(None) => Err(GenerationError::Request {
                candidate_id: request.candidate_id.clone(),
                reason: "scripted failure".to_string(),
            }),
            None => Ok(self.default_program.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// ScriptedJudge
// ---------------------------------------------------------------------------

/// What the judge saw on one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeCall {
    pub ids: Vec<String>,
    pub themes: Vec<String>,
    pub history: String,
    pub image_sizes: Vec<usize>,
}

/// Judge that returns a canned verdict (or a canned failure).
#[derive(Debug)]
pub struct ScriptedJudge {
    response: Result<String, String>,
    calls: Mutex<Vec<JudgeCall>>,
}

impl ScriptedJudge {
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            response: Err(message.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<JudgeCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[async_trait]
impl SketchJudge for ScriptedJudge {
    async fn judge(
        &self,
        submissions: &[Submission],
        history: &str,
    ) -> Result<String, JudgingError> {
        lock(&self.calls).push(JudgeCall {
            ids: submissions.iter().map(|s| s.id.clone()).collect(),
            themes: submissions.iter().map(|s| s.theme.clone()).collect(),
            history: history.to_string(),
            image_sizes: submissions.iter().map(|s| s.image.len()).collect(),
        });
        self.response.clone().map_err(JudgingError::Request)
    }
}

// ---------------------------------------------------------------------------
// RecordingDisplay / RecordingPublisher
// ---------------------------------------------------------------------------

/// Display that remembers every frame it was asked to show.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    fail: bool,
    shown: Mutex<Vec<(String, PromotionMetadata)>>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// `(title, metadata)` per call.
    pub fn shown(&self) -> Vec<(String, PromotionMetadata)> {
        lock(&self.shown).clone()
    }
}

#[async_trait]
impl FrameDisplay for RecordingDisplay {
    async fn show(
        &self,
        _image: &[u8],
        title: &str,
        metadata: &PromotionMetadata,
    ) -> Result<(), PromotionError> {
        lock(&self.shown).push((title.to_string(), metadata.clone()));
        if self.fail {
            return Err(PromotionError::Display("scripted failure".to_string()));
        }
        Ok(())
    }
}

/// Publisher that remembers every winner it was handed.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    fail: bool,
    published: Mutex<Vec<(String, PromotionMetadata)>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// `(source, metadata)` per call.
    pub fn published(&self) -> Vec<(String, PromotionMetadata)> {
        lock(&self.published).clone()
    }
}

#[async_trait]
impl GalleryPublisher for RecordingPublisher {
    async fn publish(
        &self,
        _image: &[u8],
        source: &str,
        metadata: &PromotionMetadata,
    ) -> Result<String, PromotionError> {
        lock(&self.published).push((source.to_string(), metadata.clone()));
        if self.fail {
            return Err(PromotionError::Publish("scripted failure".to_string()));
        }
        Ok(format!("published {}", metadata.candidate_id))
    }
}

// ---------------------------------------------------------------------------
// StatusRecorder
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct StatusRecorder {
    updates: Mutex<Vec<StatusUpdate>>,
}

impl StatusRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<StatusUpdate> {
        lock(&self.updates).clone()
    }

    /// Agents in the order they reported.
    pub fn agents(&self) -> Vec<String> {
        lock(&self.updates).iter().map(|u| u.agent.clone()).collect()
    }
}

#[async_trait]
impl StatusSink for StatusRecorder {
    async fn update(&self, update: &StatusUpdate) {
        lock(&self.updates).push(update.clone());
    }
}

// ---------------------------------------------------------------------------
// MemoryLedger
// ---------------------------------------------------------------------------

/// In-memory preference ledger backed by a `Vec<LedgerEntry>`.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: Mutex<Vec<LedgerEntry>>,
    fail_writes: bool,
    reads: AtomicUsize,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger whose appends always fail with an I/O error.
    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        lock(&self.entries).clone()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PreferenceLedger for MemoryLedger {
    async fn append(&self, entry: &LedgerEntry) -> LedgerResult<()> {
        if self.fail_writes {
            return Err(LedgerError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "scripted failure",
            )));
        }
        lock(&self.entries).push(entry.clone());
        Ok(())
    }

    async fn read_all(&self) -> LedgerResult<String> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let entries = lock(&self.entries);
        if entries.is_empty() {
            return Ok(SEED_HISTORY.to_string());
        }
        Ok(entries.iter().map(LedgerEntry::render).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn request(index: usize) -> GenerationRequest {
        GenerationRequest {
            candidate_id: format!("sketch_{index:03}"),
            theme: "t".to_string(),
            index,
        }
    }

    #[tokio::test]
    async fn test_scripted_generator_overrides() {
        let gen = ScriptedGenerator::new("default")
            .with_response(1, "custom")
            .failing(2);
        assert_eq!(gen.generate(&request(0)).await.unwrap(), "default");
        assert_eq!(gen.generate(&request(1)).await.unwrap(), "custom");
        assert!(gen.generate(&request(2)).await.is_err());
        assert_eq!(gen.calls(), 3);
    }

    #[tokio::test]
    async fn test_memory_ledger_seed_then_entries() {
        let ledger = MemoryLedger::new();
        assert_eq!(ledger.read_all().await.unwrap(), SEED_HISTORY);

        let entry = LedgerEntry {
            date: NaiveDate::from_ymd_opt(2026, 1, 24).unwrap(),
            period: 1,
            winner_id: "sketch_000".to_string(),
            theme: "t".to_string(),
            score: Some(5),
            reasoning: "r".to_string(),
        };
        ledger.append(&entry).await.unwrap();
        let text = ledger.read_all().await.unwrap();
        assert!(text.contains("sketch_000"));
        assert_eq!(ledger.reads(), 2);
    }

    #[tokio::test]
    async fn test_failing_ledger_rejects_writes() {
        let ledger = MemoryLedger::failing_writes();
        let entry = LedgerEntry {
            date: NaiveDate::from_ymd_opt(2026, 1, 24).unwrap(),
            period: 1,
            winner_id: "sketch_000".to_string(),
            theme: "t".to_string(),
            score: None,
            reasoning: "r".to_string(),
        };
        assert!(ledger.append(&entry).await.is_err());
        assert!(ledger.entries().is_empty());
    }
}
