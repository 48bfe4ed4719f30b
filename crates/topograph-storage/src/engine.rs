//! SqliteTopologyStore: owns the ConnectionPool, runs migrations on open,
//! implements `ITopologyStore`.
//!
//! Writes go through the single writer connection; reads use the pool.

use std::path::Path;

use tracing::info;

use topograph_core::config::StorageConfig;
use topograph_core::models::{
    BridgingEdge, DomainEdge, EntityType, ProxyVertex, StoreHealth, StoreStats, TenantShardKey,
    VersionEdge, VersionedEntity,
};
use topograph_core::traits::{ITopologyStore, VersionAppend};
use topograph_core::TopologyResult;

use crate::migrations;
use crate::pool::ConnectionPool;
use crate::queries::{
    bridging_ops, domain_edge_ops, proxy_ops, scan_ops, stats_ops, version_ops,
};

pub struct SqliteTopologyStore {
    pool: ConnectionPool,
}

impl SqliteTopologyStore {
    /// Open a file-backed store and bring its schema up to date.
    pub fn open(path: &Path, read_pool_size: usize) -> TopologyResult<Self> {
        let pool = ConnectionPool::open(path, read_pool_size)?;
        Self::init(pool, Some(path))
    }

    pub fn open_in_memory() -> TopologyResult<Self> {
        Self::init(ConnectionPool::open_in_memory()?, None)
    }

    pub fn from_config(config: &StorageConfig) -> TopologyResult<Self> {
        match &config.db_path {
            Some(path) => Self::open(Path::new(path), config.read_pool_size),
            None => Self::open_in_memory(),
        }
    }

    fn init(pool: ConnectionPool, path: Option<&Path>) -> TopologyResult<Self> {
        let applied = pool.with_writer(migrations::run_migrations)?;
        info!(
            path = ?path,
            readers = pool.reader_count(),
            migrations_applied = applied,
            "topology store opened"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }
}

impl ITopologyStore for SqliteTopologyStore {
    fn insert_proxy(&self, proxy: &ProxyVertex) -> TopologyResult<bool> {
        self.pool.with_writer(|c| proxy_ops::insert_proxy(c, proxy))
    }

    fn get_proxy(&self, id: &str) -> TopologyResult<Option<ProxyVertex>> {
        self.pool.with_reader(|c| proxy_ops::get_proxy(c, id))
    }

    fn list_proxies(&self, tenant: &TenantShardKey) -> TopologyResult<Vec<ProxyVertex>> {
        self.pool.with_reader(|c| proxy_ops::list_proxies(c, tenant))
    }

    fn latest_version(
        &self,
        tenant: &TenantShardKey,
        proxy_id: &str,
    ) -> TopologyResult<Option<VersionedEntity>> {
        // Read on the writer: the caller is about to append against this.
        self.pool
            .with_writer(|c| version_ops::latest_version(c, tenant, proxy_id))
    }

    fn append_version(&self, append: &VersionAppend) -> TopologyResult<()> {
        self.pool
            .with_writer(|c| version_ops::append_version(c, append))
    }

    fn close_if_due(
        &self,
        tenant: &TenantShardKey,
        version_id: &str,
        now: i64,
        cutoff: i64,
    ) -> TopologyResult<bool> {
        self.pool
            .with_writer(|c| version_ops::close_if_due(c, tenant, version_id, now, cutoff))
    }

    fn version_at(
        &self,
        tenant: &TenantShardKey,
        proxy_id: &str,
        t: i64,
    ) -> TopologyResult<Option<VersionedEntity>> {
        self.pool
            .with_reader(|c| version_ops::version_at(c, tenant, proxy_id, t))
    }

    fn versions_for_proxy(
        &self,
        tenant: &TenantShardKey,
        proxy_id: &str,
    ) -> TopologyResult<Vec<VersionedEntity>> {
        self.pool
            .with_reader(|c| version_ops::versions_for_proxy(c, tenant, proxy_id))
    }

    fn versions_for_tenant(
        &self,
        tenant: &TenantShardKey,
    ) -> TopologyResult<Vec<VersionedEntity>> {
        self.pool
            .with_reader(|c| version_ops::versions_for_tenant(c, tenant))
    }

    fn live_versions_due(
        &self,
        entity_type: EntityType,
        cutoff: i64,
    ) -> TopologyResult<Vec<VersionedEntity>> {
        self.pool
            .with_reader(|c| version_ops::live_versions_due(c, entity_type, cutoff))
    }

    fn versions_valid_at_page(
        &self,
        tenant: &TenantShardKey,
        entity_type: Option<EntityType>,
        at: i64,
        after_proxy: Option<&str>,
        limit: usize,
    ) -> TopologyResult<Vec<VersionedEntity>> {
        self.pool.with_reader(|c| {
            scan_ops::versions_valid_at_page(c, tenant, entity_type, at, after_proxy, limit)
        })
    }

    fn versions_overlapping_page(
        &self,
        tenant: &TenantShardKey,
        proxy_id: &str,
        from: i64,
        to: i64,
        after_created: Option<i64>,
        limit: usize,
    ) -> TopologyResult<Vec<VersionedEntity>> {
        self.pool.with_reader(|c| {
            scan_ops::versions_overlapping_page(c, tenant, proxy_id, from, to, after_created, limit)
        })
    }

    fn version_edges(&self, version_id: &str) -> TopologyResult<Vec<VersionEdge>> {
        self.pool
            .with_reader(|c| version_ops::version_edges(c, version_id))
    }

    fn upsert_domain_edge(&self, edge: &DomainEdge) -> TopologyResult<DomainEdge> {
        self.pool
            .with_writer(|c| domain_edge_ops::upsert_domain_edge(c, edge))
    }

    fn list_domain_edges(&self, tenant: &TenantShardKey) -> TopologyResult<Vec<DomainEdge>> {
        self.pool
            .with_reader(|c| domain_edge_ops::list_domain_edges(c, tenant))
    }

    fn list_inbound_domain_edges(
        &self,
        tenant: &TenantShardKey,
    ) -> TopologyResult<Vec<DomainEdge>> {
        self.pool
            .with_reader(|c| domain_edge_ops::list_inbound_domain_edges(c, tenant))
    }

    fn insert_bridging_edges(&self, edges: &[BridgingEdge]) -> TopologyResult<usize> {
        self.pool
            .with_writer(|c| bridging_ops::insert_bridging_edges(c, edges))
    }

    fn list_bridging_edges(&self, tenant: &TenantShardKey) -> TopologyResult<Vec<BridgingEdge>> {
        self.pool
            .with_reader(|c| bridging_ops::list_bridging_edges(c, tenant))
    }

    fn delete_bridging_edges(&self, tenant: &TenantShardKey) -> TopologyResult<usize> {
        self.pool
            .with_writer(|c| bridging_ops::delete_bridging_edges(c, tenant))
    }

    fn delete_bridging_edges_by_key(
        &self,
        tenant: &TenantShardKey,
        keys: &[String],
    ) -> TopologyResult<usize> {
        self.pool
            .with_writer(|c| bridging_ops::delete_bridging_edges_by_key(c, tenant, keys))
    }

    fn list_tenants(&self) -> TopologyResult<Vec<TenantShardKey>> {
        self.pool.with_reader(proxy_ops::list_tenants)
    }

    fn stats(&self) -> TopologyResult<StoreStats> {
        self.pool.with_reader(stats_ops::stats)
    }

    fn health(&self) -> TopologyResult<StoreHealth> {
        let (connected, schema_version) = self.pool.with_writer(|c| {
            Ok((stats_ops::ping(c), migrations::current_version(c)?))
        })?;
        Ok(StoreHealth {
            connected,
            wal_mode: self.pool.journal_mode()?.eq_ignore_ascii_case("wal"),
            schema_version,
        })
    }
}
