//! Health checks for the engine and its store.

use serde::Serialize;

use topograph_core::models::{StoreHealth, StoreStats};
use topograph_core::traits::ITopologyStore;
use topograph_storage::migrations::LATEST_VERSION;

/// Result of a single subsystem health check.
#[derive(Debug, Clone, Serialize)]
pub struct SubsystemCheck {
    pub name: &'static str,
    pub healthy: bool,
    /// Reason when unhealthy, status info otherwise.
    pub detail: String,
}

impl SubsystemCheck {
    pub fn ok(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            healthy: true,
            detail: detail.into(),
        }
    }

    pub fn unhealthy(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            healthy: false,
            detail: detail.into(),
        }
    }
}

/// Aggregate engine health.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub checks: Vec<SubsystemCheck>,
    pub stats: Option<StoreStats>,
    /// Tenants with mutations not yet reconciled by the enforcer.
    pub pending_tenants: usize,
}

impl HealthReport {
    pub fn from_checks(
        checks: Vec<SubsystemCheck>,
        stats: Option<StoreStats>,
        pending_tenants: usize,
    ) -> Self {
        Self {
            healthy: checks.iter().all(|c| c.healthy),
            checks,
            stats,
            pending_tenants,
        }
    }
}

/// Store connectivity and journal mode.
pub fn check_store(health: &StoreHealth) -> SubsystemCheck {
    match (health.connected, health.wal_mode) {
        (false, _) => SubsystemCheck::unhealthy("store", "not connected"),
        (true, true) => SubsystemCheck::ok("store", "connected (wal)"),
        (true, false) => SubsystemCheck::ok("store", "connected"),
    }
}

/// Schema must be fully migrated.
pub fn check_schema(health: &StoreHealth) -> SubsystemCheck {
    if health.schema_version == LATEST_VERSION {
        SubsystemCheck::ok("schema", format!("v{}", health.schema_version))
    } else {
        SubsystemCheck::unhealthy(
            "schema",
            format!(
                "at v{}, expected v{LATEST_VERSION}",
                health.schema_version
            ),
        )
    }
}

/// Run every check against `store`. Never fails: errors become unhealthy
/// checks.
pub fn run_checks(store: &dyn ITopologyStore, pending_tenants: usize) -> HealthReport {
    let mut checks = Vec::new();
    match store.health() {
        Ok(health) => {
            checks.push(check_store(&health));
            checks.push(check_schema(&health));
        }
        Err(e) => checks.push(SubsystemCheck::unhealthy("store", format!("health query failed: {e}"))),
    }
    let stats = match store.stats() {
        Ok(stats) => {
            checks.push(SubsystemCheck::ok(
                "stats",
                format!("{} proxies, {} live versions", stats.proxy_count, stats.live_version_count),
            ));
            Some(stats)
        }
        Err(e) => {
            checks.push(SubsystemCheck::unhealthy("stats", format!("query failed: {e}")));
            None
        }
    };
    HealthReport::from_checks(checks, stats, pending_tenants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use topograph_storage::SqliteTopologyStore;

    #[test]
    fn fresh_store_is_healthy() {
        let store = SqliteTopologyStore::open_in_memory().unwrap();
        let report = run_checks(&store, 0);
        assert!(report.healthy, "{report:?}");
        assert_eq!(report.checks.len(), 3);
        assert_eq!(report.stats.unwrap().proxy_count, 0);
    }

    #[test]
    fn stale_schema_is_unhealthy() {
        let check = check_schema(&StoreHealth {
            connected: true,
            wal_mode: false,
            schema_version: 1,
        });
        assert!(!check.healthy);
        assert!(check.detail.contains("expected"));
    }
}
