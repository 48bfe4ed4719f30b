//! `ITopologyStore`: persistence contract for proxies, versions and edges.
//!
//! Every read that targets tenant data takes the tenant key and filters on
//! it in the query itself. `get_proxy` is the one exception: proxy ids are
//! unique across tenants and callers need the owning tenant to raise
//! `TenantMismatch`.

use crate::errors::TopologyResult;
use crate::models::{
    BridgingEdge, DomainEdge, EntityType, ProxyVertex, StoreHealth, StoreStats, TenantShardKey,
    VersionEdge, VersionedEntity,
};

/// One compare-and-close-then-append step.
///
/// Applied inside a single immediate transaction: the expected live version
/// is closed at `version.created` with a conditional update, then the new
/// version and its two `hasVersion` edges are inserted.
#[derive(Debug, Clone)]
pub struct VersionAppend {
    /// Id of the version the caller observed as live, if any.
    pub close_live: Option<String>,
    pub version: VersionedEntity,
    /// Target of the `version → ProxyOut` edge.
    pub proxy_out_id: String,
    /// Wall-clock time stamped on the `hasVersion` edges.
    pub recorded_at: i64,
}

pub trait ITopologyStore: Send + Sync {
    // ── Proxies ──

    /// Insert a proxy if its id is unused. Returns `true` when a row was written.
    fn insert_proxy(&self, proxy: &ProxyVertex) -> TopologyResult<bool>;
    fn get_proxy(&self, id: &str) -> TopologyResult<Option<ProxyVertex>>;
    /// Proxies of one tenant ordered by `(external_id, id)`.
    fn list_proxies(&self, tenant: &TenantShardKey) -> TopologyResult<Vec<ProxyVertex>>;

    // ── Versions ──

    /// Version with the greatest `created` for the proxy.
    fn latest_version(
        &self,
        tenant: &TenantShardKey,
        proxy_id: &str,
    ) -> TopologyResult<Option<VersionedEntity>>;

    /// Fails with `ConcurrentModification` when the conditional close matches
    /// no row, or when no close was requested but the proxy already has a
    /// version reaching past `version.created`.
    fn append_version(&self, append: &VersionAppend) -> TopologyResult<()>;

    /// TTL close: `expired = now, close_reason = expired` only if the version
    /// is still live and `created <= cutoff`. Returns whether a row changed.
    fn close_if_due(
        &self,
        tenant: &TenantShardKey,
        version_id: &str,
        now: i64,
        cutoff: i64,
    ) -> TopologyResult<bool>;

    /// The version with `created <= t < expired`.
    fn version_at(
        &self,
        tenant: &TenantShardKey,
        proxy_id: &str,
        t: i64,
    ) -> TopologyResult<Option<VersionedEntity>>;

    /// Full chain ordered by `created`.
    fn versions_for_proxy(
        &self,
        tenant: &TenantShardKey,
        proxy_id: &str,
    ) -> TopologyResult<Vec<VersionedEntity>>;

    /// Every version of a tenant ordered by `(proxy_id, created)`.
    fn versions_for_tenant(&self, tenant: &TenantShardKey)
        -> TopologyResult<Vec<VersionedEntity>>;

    /// Live versions of `entity_type` with `created <= cutoff`, all tenants.
    fn live_versions_due(
        &self,
        entity_type: EntityType,
        cutoff: i64,
    ) -> TopologyResult<Vec<VersionedEntity>>;

    /// One keyset page of versions valid at `at`, ordered by `proxy_id`,
    /// starting strictly after `after_proxy`.
    fn versions_valid_at_page(
        &self,
        tenant: &TenantShardKey,
        entity_type: Option<EntityType>,
        at: i64,
        after_proxy: Option<&str>,
        limit: usize,
    ) -> TopologyResult<Vec<VersionedEntity>>;

    /// One keyset page of a proxy's versions overlapping `[from, to)`,
    /// ordered by `created`, starting strictly after `after_created`.
    fn versions_overlapping_page(
        &self,
        tenant: &TenantShardKey,
        proxy_id: &str,
        from: i64,
        to: i64,
        after_created: Option<i64>,
        limit: usize,
    ) -> TopologyResult<Vec<VersionedEntity>>;

    fn version_edges(&self, version_id: &str) -> TopologyResult<Vec<VersionEdge>>;

    // ── Domain edges ──

    /// Insert or refresh attributes on `(kind, from, to)`. Returns the stored row.
    fn upsert_domain_edge(&self, edge: &DomainEdge) -> TopologyResult<DomainEdge>;
    fn list_domain_edges(&self, tenant: &TenantShardKey) -> TopologyResult<Vec<DomainEdge>>;
    /// Edges owned by other tenants whose target proxy belongs to `tenant`.
    fn list_inbound_domain_edges(&self, tenant: &TenantShardKey)
        -> TopologyResult<Vec<DomainEdge>>;

    // ── Bridging edges ──

    /// Insert-or-ignore on `bridge_key`. Returns the number of new rows.
    fn insert_bridging_edges(&self, edges: &[BridgingEdge]) -> TopologyResult<usize>;
    fn list_bridging_edges(&self, tenant: &TenantShardKey)
        -> TopologyResult<Vec<BridgingEdge>>;
    fn delete_bridging_edges(&self, tenant: &TenantShardKey) -> TopologyResult<usize>;
    /// Delete the given bridges of one tenant. Returns the number removed.
    fn delete_bridging_edges_by_key(
        &self,
        tenant: &TenantShardKey,
        keys: &[String],
    ) -> TopologyResult<usize>;

    // ── Introspection ──

    /// Tenants owning at least one proxy.
    fn list_tenants(&self) -> TopologyResult<Vec<TenantShardKey>>;
    fn stats(&self) -> TopologyResult<StoreStats>;
    fn health(&self) -> TopologyResult<StoreHealth>;
}
