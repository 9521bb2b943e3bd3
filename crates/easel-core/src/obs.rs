//! Structured lifecycle events for a studio cycle.
//!
//! `CycleSpan` tags every log line of a cycle with its id; the `emit_*`
//! functions produce the `event = "..."` records downstream tooling keys on.

use tracing::info;

use crate::domain::outcome::ExecutionOutcome;

/// RAII guard that keeps a cycle-scoped span entered.
///
/// ```ignore
/// let _span = CycleSpan::enter(&cycle_id, "period_3");
/// ```
pub struct CycleSpan {
    _span: tracing::span::EnteredSpan,
}

impl CycleSpan {
    pub fn enter(cycle_id: &str, period: &str) -> Self {
        Self {
            _span: cycle_span(cycle_id, period).entered(),
        }
    }
}

/// The span itself, for instrumenting futures that cross await points.
pub fn cycle_span(cycle_id: &str, period: &str) -> tracing::Span {
    tracing::info_span!("easel.cycle", cycle_id = %cycle_id, period = %period)
}

pub fn emit_cycle_started(cycle_id: &str, period: &str, requested: usize) {
    info!(event = "cycle.started", cycle_id = %cycle_id, period = %period, requested = requested);
}

/// A stage of the cycle finished.
pub fn emit_stage_completed(cycle_id: &str, stage: &str, detail: &str) {
    info!(event = "stage.completed", cycle_id = %cycle_id, stage = %stage, detail = %detail);
}

pub fn emit_candidate_executed(candidate_id: &str, outcome: &ExecutionOutcome) {
    if outcome.is_success() {
        info!(
            event = "candidate.executed",
            candidate_id = %candidate_id,
            status = %outcome.status,
            elapsed_ms = outcome.elapsed_ms,
        );
    } else {
        tracing::warn!(
            event = "candidate.executed",
            candidate_id = %candidate_id,
            status = %outcome.status,
            elapsed_ms = outcome.elapsed_ms,
            message = %outcome.message,
        );
    }
}

pub fn emit_cycle_finished(
    cycle_id: &str,
    duration_ms: u64,
    rendered: usize,
    winner: Option<&str>,
) {
    info!(
        event = "cycle.finished",
        cycle_id = %cycle_id,
        duration_ms = duration_ms,
        rendered = rendered,
        winner = winner.unwrap_or("-"),
    );
}

/// Non-fatal collaborator failure (warning level).
pub fn emit_collaborator_error(cycle_id: &str, collaborator: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(
        event = "collaborator.error",
        cycle_id = %cycle_id,
        collaborator = %collaborator,
        error = %error,
    );
}
