//! Easel Core Library
//!
//! Sandboxed sketch execution, judgment parsing, the preference ledger and the
//! batch orchestrator that ties one generation period together.
//!
//! A cycle runs `generate -> execute -> aggregate -> judge -> parse ->
//! promote -> record`. Per-candidate failures stay inside the execution stage;
//! only a judging failure ends a cycle early with an error.

pub mod collaborator;
pub mod config;
pub mod domain;
pub mod fakes;
pub mod judgment;
pub mod ledger;
pub mod metrics;
pub mod obs;
pub mod orchestrator;
pub mod sandbox;
pub mod telemetry;

pub use collaborator::{
    FrameDisplay, GalleryPublisher, GenerationRequest, LogStatus, PromotionMetadata,
    SketchGenerator, SketchJudge, StatusSink, StatusUpdate, Submission,
};
pub use config::{StudioConfig, WinnerFallback, DEFAULT_THEMES, MAX_CANDIDATES};
pub use domain::{
    Batch, Candidate, ExecutionOutcome, ExecutionStatus, GenerationError, JudgingError,
    JudgmentResult, LedgerError, Period, ProgramExtractor, PromotionError, Result, StudioError,
    WinnerSource,
};
pub use judgment::JudgmentParser;
pub use ledger::{FileLedger, LedgerEntry, PreferenceLedger, SEED_HISTORY};
pub use metrics::METRICS;
pub use obs::CycleSpan;
pub use orchestrator::{
    AbortReason, BatchOrchestrator, Collaborators, CycleOutcome, CycleReport, CycleStage,
    PromotionReport,
};
pub use sandbox::{Capabilities, Capability, SandboxExecutor, Surface};
pub use telemetry::init_tracing;

/// Easel version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
