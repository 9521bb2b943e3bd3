//! Global atomic counters for cycle observability.
//!
//! Counters are bumped at the call site; [`Metrics::flush`] emits them as a
//! single `info!` event at the end of each cycle.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::outcome::ExecutionStatus;

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    candidates_generated: AtomicU64,
    candidates_rendered: AtomicU64,
    candidates_failed: AtomicU64,
    candidates_timed_out: AtomicU64,
    cycles_completed: AtomicU64,
    cycles_aborted: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            candidates_generated: AtomicU64::new(0),
            candidates_rendered: AtomicU64::new(0),
            candidates_failed: AtomicU64::new(0),
            candidates_timed_out: AtomicU64::new(0),
            cycles_completed: AtomicU64::new(0),
            cycles_aborted: AtomicU64::new(0),
        }
    }

    pub fn inc_generated(&self) {
        self.candidates_generated.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "candidates_generated", "counter incremented");
    }

    /// Count one execution under its outcome.
    pub fn record_execution(&self, status: ExecutionStatus) {
        let (counter, name) = match status {
            ExecutionStatus::Succeeded => (&self.candidates_rendered, "candidates_rendered"),
            ExecutionStatus::Failed => (&self.candidates_failed, "candidates_failed"),
            ExecutionStatus::TimedOut => (&self.candidates_timed_out, "candidates_timed_out"),
        };
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = name, "counter incremented");
    }

    pub fn inc_cycles_completed(&self) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "cycles_completed", "counter incremented");
    }

    pub fn inc_cycles_aborted(&self) {
        self.cycles_aborted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "cycles_aborted", "counter incremented");
    }

    /// Emit all current counter values as one `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            candidates_generated = self.candidates_generated(),
            candidates_rendered = self.candidates_rendered(),
            candidates_failed = self.candidates_failed(),
            candidates_timed_out = self.candidates_timed_out(),
            cycles_completed = self.cycles_completed(),
            cycles_aborted = self.cycles_aborted(),
        );
    }

    pub fn candidates_generated(&self) -> u64 {
        self.candidates_generated.load(Ordering::Relaxed)
    }

    pub fn candidates_rendered(&self) -> u64 {
        self.candidates_rendered.load(Ordering::Relaxed)
    }

    pub fn candidates_failed(&self) -> u64 {
        self.candidates_failed.load(Ordering::Relaxed)
    }

    pub fn candidates_timed_out(&self) -> u64 {
        self.candidates_timed_out.load(Ordering::Relaxed)
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed.load(Ordering::Relaxed)
    }

    pub fn cycles_aborted(&self) -> u64 {
        self.cycles_aborted.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        for counter in [
            &self.candidates_generated,
            &self.candidates_rendered,
            &self.candidates_failed,
            &self.candidates_timed_out,
            &self.cycles_completed,
            &self.cycles_aborted,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executions_are_counted_by_status() {
        let m = Metrics::new();
        m.record_execution(ExecutionStatus::Succeeded);
        m.record_execution(ExecutionStatus::Succeeded);
        m.record_execution(ExecutionStatus::Failed);
        m.record_execution(ExecutionStatus::TimedOut);
        assert_eq!(m.candidates_rendered(), 2);
        assert_eq!(m.candidates_failed(), 1);
        assert_eq!(m.candidates_timed_out(), 1);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_generated();
        m.inc_cycles_completed();
        m.inc_cycles_aborted();
        m.reset();
        assert_eq!(m.candidates_generated(), 0);
        assert_eq!(m.cycles_completed(), 0);
        assert_eq!(m.cycles_aborted(), 0);
    }
}
