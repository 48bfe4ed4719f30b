use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{TopologyError, TopologyResult};

/// Reserved tenant for shared reference entities (e.g. a global location taxonomy).
pub const SHARED_TENANT: &str = "__shared__";

/// Identifies the tenant a proxy, version or edge belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantShardKey(String);

impl TenantShardKey {
    /// Build a tenant key. Empty or whitespace-only keys are rejected.
    pub fn new(key: impl Into<String>) -> TopologyResult<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(TopologyError::InvalidInput(
                "tenant shard key must not be empty".to_string(),
            ));
        }
        Ok(Self(key))
    }

    /// The shared reference tenant.
    pub fn shared() -> Self {
        Self(SHARED_TENANT.to_string())
    }

    pub fn is_shared(&self) -> bool {
        self.0 == SHARED_TENANT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantShardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TenantShardKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
