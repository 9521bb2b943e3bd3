//! Domain-level error taxonomy for Easel.
//!
//! Per-candidate problems (`GenerationError`, execution failures) never leave
//! the stage that produced them. `JudgingError` is the only one that ends a
//! cycle early; `PromotionError` and `LedgerError` are logged and the cycle
//! carries on.

/// A single generation request failed. The slot is dropped from the batch.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation request for {candidate_id} failed: {reason}")]
    Request {
        candidate_id: String,
        reason: String,
    },

    #[error("generator returned no program for {candidate_id}")]
    EmptyProgram { candidate_id: String },
}

/// The judging call failed. Fatal to the cycle.
#[derive(Debug, thiserror::Error)]
pub enum JudgingError {
    #[error("judge request failed: {0}")]
    Request(String),

    #[error("judge returned an empty evaluation")]
    EmptyResponse,

    #[error("failed to read rendered image for {candidate_id}: {source}")]
    Image {
        candidate_id: String,
        #[source]
        source: std::io::Error,
    },
}

/// Display or publish failed. Logged; the cycle still records the winner.
#[derive(Debug, thiserror::Error)]
pub enum PromotionError {
    #[error("display update failed: {0}")]
    Display(String),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("git error: {0}")]
    Git(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Preference ledger read/write failure.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Cycle-level errors returned by the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    #[error("invalid studio config: {0}")]
    InvalidConfig(String),

    #[error("judging failed: {0}")]
    Judging(#[from] JudgingError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Easel cycle operations.
pub type Result<T> = std::result::Result<T, StudioError>;
