use super::StorageError;

/// Top-level error type for the topology engine.
/// Storage and serialization failures convert into this via `From` impls.
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    /// An operation touched a document owned by another tenant.
    #[error("tenant mismatch on {resource}: expected {expected}, found {found}")]
    TenantMismatch {
        resource: String,
        expected: String,
        found: String,
    },

    #[error("non-monotonic time for proxy {proxy_id}: requested {requested}, current version bound {current}")]
    NonMonotonicTime {
        proxy_id: String,
        current: i64,
        requested: i64,
    },

    #[error("unresolved entity reference {reference}: {reason}")]
    UnresolvedEntityReference { reference: String, reason: String },

    #[error("connectivity invariant violated for tenant {tenant}: {} orphaned proxies", orphans.len())]
    ConnectivityInvariantViolation {
        tenant: String,
        orphans: Vec<String>,
    },

    #[error("not found: {what}")]
    NotFound { what: String },

    /// The conditional close of a live version matched no row: another
    /// writer transitioned it first.
    #[error("concurrent modification of proxy {proxy_id}: {reason}")]
    ConcurrentModification { proxy_id: String, reason: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TopologyError {
    /// Shorthand used at every tenant boundary.
    pub fn tenant_mismatch(
        resource: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::TenantMismatch {
            resource: resource.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unresolved(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnresolvedEntityReference {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by isolation breaches. These are never retried.
    pub fn is_isolation_violation(&self) -> bool {
        matches!(self, Self::TenantMismatch { .. })
    }
}

/// Convenience type alias.
pub type TopologyResult<T> = Result<T, TopologyError>;
