//! Execution outcomes reported by the sandbox.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a single candidate execution ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Succeeded,
    Failed,
    TimedOut,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Succeeded => write!(f, "succeeded"),
            ExecutionStatus::Failed => write!(f, "failed"),
            ExecutionStatus::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// Result of running one candidate through the sandbox.
///
/// `status == Succeeded` exactly when the output path holds a non-empty image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub status: ExecutionStatus,

    /// "Success", or the error text with full detail.
    pub message: String,

    /// Wall-clock time of the attempt in milliseconds.
    pub elapsed_ms: u64,
}

impl ExecutionOutcome {
    pub fn succeeded(elapsed: Duration) -> Self {
        Self {
            status: ExecutionStatus::Succeeded,
            message: "Success".to_string(),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn failed(message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            status: ExecutionStatus::Failed,
            message: message.into(),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn timed_out(limit: Duration, elapsed: Duration) -> Self {
        Self {
            status: ExecutionStatus::TimedOut,
            message: format!("execution exceeded {}ms", limit.as_millis()),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    /// Whether the candidate rendered.
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Succeeded
    }
}
