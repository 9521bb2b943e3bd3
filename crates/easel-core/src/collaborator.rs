//! Collaborator traits for the external services a cycle talks to.
//!
//! These traits define the seams of the orchestrator:
//! - `SketchGenerator`: produces program text for one batch slot
//! - `SketchJudge`: evaluates all rendered images in one request
//! - `FrameDisplay`: shows the winner locally
//! - `GalleryPublisher`: copies the winner into durable storage
//! - `StatusSink`: receives stage-by-stage progress
//!
//! All traits are async and backend-agnostic. Each implementation enforces
//! its own timeouts. In-memory fakes live in the `fakes` module.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::candidate::Candidate;
use crate::domain::error::{GenerationError, JudgingError, PromotionError};
use crate::domain::judgment::JudgmentResult;
use crate::domain::period::Period;

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// One slot of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub candidate_id: String,
    pub theme: String,
    /// Slot position in the batch (0-based).
    pub index: usize,
}

#[async_trait]
pub trait SketchGenerator: Send + Sync {
    /// Produce program text for one slot. May return it wrapped in a fenced
    /// code block; the orchestrator strips the fence.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

// ---------------------------------------------------------------------------
// Judging
// ---------------------------------------------------------------------------

/// A rendered candidate as handed to the judge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: String,
    pub theme: String,
    /// PNG bytes.
    pub image: Vec<u8>,
}

#[async_trait]
pub trait SketchJudge: Send + Sync {
    /// Evaluate all submissions against the preference history and return
    /// the judge's free-text verdict.
    async fn judge(&self, submissions: &[Submission], history: &str)
        -> Result<String, JudgingError>;
}

// ---------------------------------------------------------------------------
// Promotion
// ---------------------------------------------------------------------------

/// Everything known about a promoted winner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionMetadata {
    pub date: NaiveDate,
    pub period: u8,
    pub candidate_id: String,
    pub theme: String,
    pub score: Option<u32>,
    pub reasoning: String,
    /// Full judge output.
    pub evaluation: String,
    /// SHA-256 hex of the winner's program text.
    pub source_digest: String,
}

impl PromotionMetadata {
    pub fn for_winner(period: &Period, winner: &Candidate, judgment: &JudgmentResult) -> Self {
        Self {
            date: period.date,
            period: period.number,
            candidate_id: winner.id.clone(),
            theme: winner.theme.clone(),
            score: judgment.score,
            reasoning: judgment.reasoning.clone(),
            evaluation: judgment.evaluation.clone(),
            source_digest: hex::encode(Sha256::digest(winner.source.as_bytes())),
        }
    }

    /// Period label shown next to the frame, e.g. `Period 2`.
    pub fn period_label(&self) -> String {
        format!("Period {}", self.period)
    }
}

#[async_trait]
pub trait FrameDisplay: Send + Sync {
    /// Show the winning image with a title.
    async fn show(
        &self,
        image: &[u8],
        title: &str,
        metadata: &PromotionMetadata,
    ) -> Result<(), PromotionError>;
}

#[async_trait]
pub trait GalleryPublisher: Send + Sync {
    /// Persist the winner and return a human-readable confirmation.
    async fn publish(
        &self,
        image: &[u8],
        source: &str,
        metadata: &PromotionMetadata,
    ) -> Result<String, PromotionError>;
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Progress report pushed at each stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub agent: String,
    pub task: String,
    pub progress: Option<String>,
    pub timestamp: NaiveDateTime,
    /// e.g. `in 2h 15m`
    pub next_cycle: String,
}

impl StatusUpdate {
    pub fn new(
        agent: impl Into<String>,
        task: impl Into<String>,
        progress: Option<String>,
        at: NaiveDateTime,
    ) -> Self {
        Self {
            agent: agent.into(),
            task: task.into(),
            progress,
            timestamp: at,
            next_cycle: Period::next_cycle_hint(at),
        }
    }
}

/// Receives status updates. Failures are the sink's own business and are
/// never reported back to the cycle.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn update(&self, update: &StatusUpdate);
}

/// Sink that only traces.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStatus;

#[async_trait]
impl StatusSink for LogStatus {
    async fn update(&self, update: &StatusUpdate) {
        tracing::info!(
            agent = %update.agent,
            task = %update.task,
            progress = update.progress.as_deref().unwrap_or("-"),
            next_cycle = %update.next_cycle,
            "status"
        );
    }
}
