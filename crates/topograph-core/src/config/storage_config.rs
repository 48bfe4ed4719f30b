//! Storage subsystem configuration.

use serde::{Deserialize, Serialize};

/// Where and how the SQLite store is opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file. `None` opens an in-memory store.
    pub db_path: Option<String>,
    /// Reader connections alongside the single writer (file-backed only).
    pub read_pool_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            read_pool_size: 2,
        }
    }
}
