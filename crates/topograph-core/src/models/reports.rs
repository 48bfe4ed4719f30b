use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::TenantShardKey;

/// A per-item failure recorded by a TTL sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepFailure {
    pub proxy_id: String,
    pub version_id: String,
    pub reason: String,
}

/// Outcome of one TTL sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub now: i64,
    /// Candidate live versions found past their horizon.
    pub scanned: u64,
    pub closed: u64,
    /// Candidates already closed or superseded by the time the lock was taken.
    pub skipped: u64,
    pub failed: u64,
    pub failures: Vec<SweepFailure>,
    pub duration_ms: u32,
}

/// Outcome of one connectivity enforcement run for a tenant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnforcementReport {
    pub tenant: Option<TenantShardKey>,
    pub proxies_scanned: usize,
    /// Newly inserted bridging edges, keyed by connection type.
    pub edges_created: BTreeMap<String, usize>,
    /// Index-derived bridges no longer planned for the current proxy set,
    /// keyed by connection type.
    #[serde(default)]
    pub edges_removed: BTreeMap<String, usize>,
    /// Direct edges added because the modulus rule left an index uncovered.
    pub coverage_fallbacks: usize,
    /// Orphan-repair passes needed after the postcondition scan.
    pub repair_passes: u32,
    pub orphans_remaining: usize,
    pub duration_ms: u32,
}

impl EnforcementReport {
    pub fn total_created(&self) -> usize {
        self.edges_created.values().sum()
    }

    pub fn total_removed(&self) -> usize {
        self.edges_removed.values().sum()
    }
}

/// Degree-index view of a tenant's graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityReport {
    pub tenant: Option<TenantShardKey>,
    pub proxy_count: usize,
    pub domain_edge_count: usize,
    pub bridging_edge_count: usize,
    pub bridging_by_type: BTreeMap<String, usize>,
    pub orphans: Vec<String>,
    /// Weakly connected components over domain ∪ bridging edges.
    pub component_count: usize,
}

/// Row counts across the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub proxy_count: u64,
    pub version_count: u64,
    pub live_version_count: u64,
    pub version_edge_count: u64,
    pub domain_edge_count: u64,
    pub bridging_edge_count: u64,
}

/// Health status of the backing store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreHealth {
    pub connected: bool,
    pub wal_mode: bool,
    pub schema_version: u32,
}
