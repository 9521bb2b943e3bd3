//! Error types for the collaborator implementations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    /// Transport-level failure (connect, timeout, TLS, body decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The API answered but carried no text.
    #[error("API response contained no text")]
    EmptyResponse,

    #[error("missing configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An external command exited unsuccessfully.
    #[error("command `{command}` failed: {stderr}")]
    Command { command: String, stderr: String },
}

pub type AgentResult<T> = std::result::Result<T, AgentError>;
