//! The candidates of one cycle after execution.

use serde::{Deserialize, Serialize};

use super::candidate::Candidate;
use super::outcome::ExecutionOutcome;

/// Candidates produced and processed in one cycle.
///
/// `rendered` keeps generation order no matter how execution was scheduled,
/// and never holds more than `requested` entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Batch {
    /// Configured candidate count (N).
    pub requested: usize,

    /// Candidates whose execution succeeded, in generation order.
    pub rendered: Vec<Candidate>,

    /// Ids and outcomes of candidates that failed or timed out.
    pub failed: Vec<(String, ExecutionOutcome)>,
}

impl Batch {
    pub fn new(requested: usize) -> Self {
        Self {
            requested,
            ..Self::default()
        }
    }

    /// Number of candidates that actually ran.
    pub fn executed(&self) -> usize {
        self.rendered.len() + self.failed.len()
    }

    /// Nothing rendered: the cycle stops before judging.
    pub fn is_empty(&self) -> bool {
        self.rendered.is_empty()
    }

    /// Ids of the rendered candidates in batch order.
    pub fn rendered_ids(&self) -> Vec<String> {
        self.rendered.iter().map(|c| c.id.clone()).collect()
    }

    /// Look up a rendered candidate by id.
    pub fn find(&self, id: &str) -> Option<&Candidate> {
        self.rendered.iter().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_batch_accessors() {
        let mut batch = Batch::new(3);
        assert!(batch.is_empty());

        batch
            .rendered
            .push(Candidate::new("sketch_000", "a", "").with_artifact("a.png"));
        batch
            .rendered
            .push(Candidate::new("sketch_002", "c", "").with_artifact("c.png"));
        batch.failed.push((
            "sketch_001".to_string(),
            ExecutionOutcome::failed("bad", Duration::ZERO),
        ));

        assert!(!batch.is_empty());
        assert_eq!(batch.executed(), 3);
        assert_eq!(batch.rendered_ids(), vec!["sketch_000", "sketch_002"]);
        assert_eq!(batch.find("sketch_002").map(|c| c.theme.as_str()), Some("c"));
        assert!(batch.find("sketch_001").is_none());
    }
}
