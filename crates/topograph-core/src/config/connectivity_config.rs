//! Connectivity enforcement configuration.

use serde::{Deserialize, Serialize};

use crate::errors::{TopologyError, TopologyResult};
use crate::models::EntityType;

/// Tuning for the bridging passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    /// K in the `(i + j) mod K == 0` domain-internal rule.
    pub modulus: usize,
    /// Domains that receive `{domain}_proxy_network` bridging.
    pub internal_bridging_domains: Vec<EntityType>,
    /// `(a, b)`: connect `a.out[i] → b.out[i]`.
    pub cross_domain_pairs: Vec<(EntityType, EntityType)>,
    /// Synthetic attributes stamped on every bridging edge.
    pub nominal_bandwidth_mbps: f64,
    pub nominal_latency_ms: f64,
    /// Orphan-repair passes after a failed postcondition scan.
    pub max_enforcement_retries: u32,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            modulus: 3,
            internal_bridging_domains: vec![EntityType::Software],
            cross_domain_pairs: vec![
                (EntityType::Device, EntityType::Software),
                (EntityType::Device, EntityType::Location),
            ],
            nominal_bandwidth_mbps: 0.0,
            nominal_latency_ms: 0.0,
            max_enforcement_retries: 1,
        }
    }
}

impl ConnectivityConfig {
    pub fn validate(&self) -> TopologyResult<()> {
        if self.modulus == 0 {
            return Err(TopologyError::Config(
                "connectivity.modulus must be > 0".to_string(),
            ));
        }
        if let Some((a, _)) = self.cross_domain_pairs.iter().find(|(a, b)| a == b) {
            return Err(TopologyError::Config(format!(
                "connectivity.cross_domain_pairs: ({a}, {a}) is not cross-domain"
            )));
        }
        if !self.nominal_bandwidth_mbps.is_finite() || !self.nominal_latency_ms.is_finite() {
            return Err(TopologyError::Config(
                "connectivity nominal attributes must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
