//! Error types for the sandbox module.
//!
//! These never escape [`SandboxExecutor::execute`](super::SandboxExecutor::execute);
//! they are folded into an `ExecutionOutcome` message.

/// Errors produced while running a candidate program.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("surface size {width}x{height} outside 1..={max}")]
    SurfaceSize { width: i64, height: i64, max: u32 },

    #[error("no surface produced")]
    NoSurface,

    #[error("script error: {0}")]
    Script(String),

    #[error("execution interrupted at deadline")]
    Interrupted,

    #[error("png encoding failed: {0}")]
    Encode(String),

    #[error("sandbox worker panicked: {0}")]
    Panicked(String),

    #[error("failed to start sandbox worker: {0}")]
    Spawn(String),
}

/// Result type for sandbox operations.
pub type SandboxResult<T> = std::result::Result<T, SandboxError>;
