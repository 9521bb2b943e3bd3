//! Domain models for Easel.
//!
//! Canonical definitions for the core entities:
//! - `Candidate`: one generated sketch program
//! - `ExecutionOutcome`: what happened when a candidate ran
//! - `Batch`: the candidates of one cycle and which of them rendered
//! - `JudgmentResult`: the parsed verdict of the judge
//! - `Period`: the 6-hour slot a cycle belongs to

pub mod batch;
pub mod candidate;
pub mod error;
pub mod judgment;
pub mod outcome;
pub mod period;

// Re-export main types and errors
pub use batch::Batch;
pub use candidate::{Candidate, ProgramExtractor};
pub use error::{
    GenerationError, JudgingError, LedgerError, PromotionError, Result, StudioError,
};
pub use judgment::{JudgmentResult, WinnerSource};
pub use outcome::{ExecutionOutcome, ExecutionStatus};
pub use period::Period;
