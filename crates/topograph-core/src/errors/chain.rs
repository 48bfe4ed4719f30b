//! ErrorChain: accumulate non-fatal per-item failures during batch work.

use super::TopologyError;

/// One failure recorded at a given step of a batch.
#[derive(Debug)]
pub struct ChainedError {
    /// Position in the batch (0-based).
    pub step: usize,
    /// The item the failure belongs to (proxy id, version id, ...).
    pub subject: String,
    pub error: TopologyError,
}

/// Ordered collection of per-item failures. A batch keeps going after a push.
#[derive(Debug, Default)]
pub struct ErrorChain {
    errors: Vec<ChainedError>,
}

impl ErrorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: usize, subject: impl Into<String>, error: TopologyError) {
        self.errors.push(ChainedError {
            step,
            subject: subject.into(),
            error,
        });
    }

    pub fn into_vec(self) -> Vec<ChainedError> {
        self.errors
    }
}
