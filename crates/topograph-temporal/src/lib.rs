//! # topograph-temporal
//!
//! The temporal topology engine. Proxy-vertex identity, append-only version
//! chains, proxy-targeted domain edges, background connectivity
//! reconciliation, TTL expiration and read-only time travel.

pub mod connectivity;
pub mod edges;
pub mod engine;
pub mod health;
pub mod observability;
pub mod proxy;
pub mod query;
pub mod ttl;
pub mod versioning;

pub use connectivity::ConnectivityInvariantEnforcer;
pub use edges::EdgeRewriter;
pub use engine::{MaintenanceReport, TopologyEngine};
pub use health::HealthReport;
pub use proxy::{ProxyLocks, ProxyVertexManager};
pub use query::{TimeTravelQueryPlanner, VersionScan};
pub use ttl::{SweepScheduler, TtlExpirationEngine};
pub use versioning::VersionChainBuilder;

/// Wall-clock epoch seconds, used for bookkeeping timestamps
/// (`created_at` columns), never for valid time.
pub(crate) fn wall_clock() -> i64 {
    chrono::Utc::now().timestamp()
}
