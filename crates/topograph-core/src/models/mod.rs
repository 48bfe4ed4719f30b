mod edge;
mod entity;
mod proxy;
mod reports;
mod tenant;
mod version;

pub use edge::{
    BridgeType, BridgingEdge, DomainEdge, DomainEdgeKind, DomainEdgeSpec, VersionEdge,
    VersionEdgeDirection,
};
pub use entity::{EntityRef, EntityType, ProxyRole};
pub use proxy::{LiveStatus, ProxyPair, ProxyVertex};
pub use reports::{
    ConnectivityReport, EnforcementReport, StoreHealth, StoreStats, SweepFailure, SweepReport,
};
pub use tenant::{TenantShardKey, SHARED_TENANT};
pub use version::{CloseReason, TemporalRecord, VersionState, VersionedEntity, MAX_TIMESTAMP};
