//! RecoveryAction enum: what to do when a topology operation fails.

use std::fmt;

use super::{StorageError, TopologyError};

/// Recommended recovery action for a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Retry the operation (transient failure, or a bounded enforcement retry).
    Retry,
    /// The caller can repair the precondition and try again.
    Fallback,
    /// Escalate to the caller: retrying with the same input reproduces it.
    Escalate,
    /// Nothing to recover; the result is simply absent.
    Ignore,
}

impl RecoveryAction {
    /// Determine the recommended recovery action for a TopologyError.
    pub fn for_error(error: &TopologyError) -> Self {
        match error {
            // Isolation breaches are always surfaced, never retried.
            TopologyError::TenantMismatch { .. } => Self::Escalate,

            // Same input, same failure.
            TopologyError::NonMonotonicTime { .. } => Self::Escalate,
            TopologyError::InvalidInput(_) => Self::Escalate,
            TopologyError::Config(_) => Self::Escalate,
            TopologyError::Serialization(_) => Self::Escalate,

            // Caller may create the missing proxy and retry.
            TopologyError::UnresolvedEntityReference { .. } => Self::Fallback,

            // One bounded enforcement pass.
            TopologyError::ConnectivityInvariantViolation { .. } => Self::Retry,

            // Lost the conditional update race: re-read and retry.
            TopologyError::ConcurrentModification { .. } => Self::Retry,

            TopologyError::Storage(StorageError::Busy { .. }) => Self::Retry,
            TopologyError::Storage(StorageError::Pool(_)) => Self::Retry,
            TopologyError::Storage(_) => Self::Escalate,

            TopologyError::NotFound { .. } => Self::Ignore,
        }
    }
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retry => write!(f, "Retry"),
            Self::Fallback => write!(f, "Fallback"),
            Self::Escalate => write!(f, "Escalate"),
            Self::Ignore => write!(f, "Ignore"),
        }
    }
}
