//! Time-travel query configuration.

use serde::{Deserialize, Serialize};

use crate::errors::{TopologyError, TopologyResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Rows fetched per page by lazy version scans.
    pub page_size: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { page_size: 256 }
    }
}

impl QueryConfig {
    pub fn validate(&self) -> TopologyResult<()> {
        if self.page_size == 0 {
            return Err(TopologyError::Config(
                "query.page_size must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
