//! ITopologyEngine: the public face of the temporal topology engine.

use crate::errors::TopologyResult;
use crate::models::{
    DomainEdge, DomainEdgeSpec, EnforcementReport, EntityType, SweepReport, TenantShardKey,
    VersionedEntity,
};

/// Mutation, time-travel, maintenance and linking over one topology.
///
/// Timestamps are epoch seconds. `state_as_of` never mutates.
pub trait ITopologyEngine: Send + Sync {
    fn apply_mutation(
        &self,
        tenant: &TenantShardKey,
        entity_type: EntityType,
        external_id: &str,
        payload: serde_json::Value,
        timestamp: i64,
    ) -> TopologyResult<VersionedEntity>;

    fn state_as_of(
        &self,
        tenant: &TenantShardKey,
        entity_type: EntityType,
        external_id: &str,
        timestamp: i64,
    ) -> TopologyResult<VersionedEntity>;

    fn sweep_expired(&self, now: i64) -> TopologyResult<SweepReport>;

    fn enforce_connectivity(&self, tenant: &TenantShardKey) -> TopologyResult<EnforcementReport>;

    fn link(&self, spec: DomainEdgeSpec) -> TopologyResult<DomainEdge>;

    fn history(
        &self,
        tenant: &TenantShardKey,
        entity_type: EntityType,
        external_id: &str,
    ) -> TopologyResult<Vec<VersionedEntity>>;
}
