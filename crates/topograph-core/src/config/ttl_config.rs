//! TTL expiration configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{TopologyError, TopologyResult};
use crate::models::EntityType;

/// Per-entity-type horizons for the TTL sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlConfig {
    /// Entity type name → seconds a live version may stay live.
    /// Types absent from the map never age out.
    pub ttl_seconds: BTreeMap<String, u64>,
    /// Interval for the background maintenance task.
    pub sweep_interval_secs: u64,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: BTreeMap::new(),
            sweep_interval_secs: 60,
        }
    }
}

impl TtlConfig {
    pub fn ttl_for(&self, entity_type: EntityType) -> Option<u64> {
        self.ttl_seconds.get(entity_type.as_str()).copied()
    }

    pub fn set_ttl(&mut self, entity_type: EntityType, seconds: u64) {
        self.ttl_seconds
            .insert(entity_type.as_str().to_string(), seconds);
    }

    /// Configured `(type, ttl)` pairs in a stable order.
    pub fn horizons(&self) -> Vec<(EntityType, u64)> {
        EntityType::ALL
            .iter()
            .filter_map(|t| self.ttl_for(*t).map(|ttl| (*t, ttl)))
            .collect()
    }

    pub fn validate(&self) -> TopologyResult<()> {
        for (name, ttl) in &self.ttl_seconds {
            name.parse::<EntityType>()
                .map_err(|e| TopologyError::Config(format!("ttl.ttl_seconds: {e}")))?;
            if *ttl == 0 {
                return Err(TopologyError::Config(format!(
                    "ttl.ttl_seconds.{name} must be > 0"
                )));
            }
            if *ttl > i64::MAX as u64 {
                return Err(TopologyError::Config(format!(
                    "ttl.ttl_seconds.{name} is out of range"
                )));
            }
        }
        if self.sweep_interval_secs == 0 {
            return Err(TopologyError::Config(
                "ttl.sweep_interval_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
