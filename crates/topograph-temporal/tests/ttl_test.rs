//! TTL sweeps through the engine and the background scheduler.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

use topograph_core::errors::StorageError;
use topograph_core::models::{
    BridgingEdge, CloseReason, DomainEdge, EntityType, LiveStatus, ProxyVertex, StoreHealth,
    StoreStats, TenantShardKey, VersionEdge, VersionedEntity,
};
use topograph_core::traits::{ITopologyEngine, ITopologyStore, VersionAppend};
use topograph_core::{TopologyConfig, TopologyResult};
use topograph_storage::SqliteTopologyStore;
use topograph_temporal::{SweepScheduler, TopologyEngine};

// ─── Fixtures ────────────────────────────────────────────────────────────────

fn acme() -> TenantShardKey {
    TenantShardKey::new("acme").unwrap()
}

fn engine_with_device_ttl(ttl: u64) -> TopologyEngine {
    let mut config = TopologyConfig::default();
    config.ttl.set_ttl(EntityType::Device, ttl);
    TopologyEngine::new(config).unwrap()
}

#[test]
fn sweep_closes_without_a_new_version() {
    let e = engine_with_device_ttl(3_600);
    let v = e
        .apply_mutation(&acme(), EntityType::Device, "42", json!({}), 1_000)
        .unwrap();
    let versions_before = e.store().stats().unwrap().version_count;

    let now = v.created() + 3_600 + 1;
    let report = e.sweep_expired(now).unwrap();
    assert_eq!(report.closed, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(e.store().stats().unwrap().version_count, versions_before);

    match e.live_status(&acme(), EntityType::Device, "42").unwrap() {
        LiveStatus::NoLiveVersion { last_closed } => {
            assert_eq!(last_closed.id, v.id);
            assert_eq!(last_closed.expired(), now);
            assert_eq!(last_closed.close_reason, Some(CloseReason::Expired));
        }
        other => panic!("expected no live version, got {other:?}"),
    }

    // Still visible to time travel inside its interval.
    assert_eq!(e.state_as_of(&acme(), EntityType::Device, "42", now - 1).unwrap().id, v.id);
    assert!(e.state_as_of(&acme(), EntityType::Device, "42", now).is_err());
}

#[test]
fn sweep_spans_tenants_and_skips_young_versions() {
    let e = engine_with_device_ttl(100);
    let globex = TenantShardKey::new("globex").unwrap();
    e.apply_mutation(&acme(), EntityType::Device, "old", json!({}), 0).unwrap();
    e.apply_mutation(&globex, EntityType::Device, "old", json!({}), 0).unwrap();
    e.apply_mutation(&acme(), EntityType::Device, "young", json!({}), 950).unwrap();

    let report = e.sweep_expired(1_000).unwrap();
    assert_eq!((report.scanned, report.closed), (2, 2));
    assert!(e.live_status(&acme(), EntityType::Device, "young").unwrap().is_live());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scheduler_runs_until_shutdown() {
    let engine = Arc::new(engine_with_device_ttl(1));
    engine
        .apply_mutation(&acme(), EntityType::Device, "42", json!({}), 0)
        .unwrap();

    let scheduler = SweepScheduler::spawn(engine.clone(), Duration::from_millis(20));
    let mut waited = 0;
    while scheduler.runs() == 0 && waited < 250 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += 1;
    }
    assert!(scheduler.runs() >= 1);
    scheduler.shutdown().await;

    assert!(!engine
        .live_status(&acme(), EntityType::Device, "42")
        .unwrap()
        .is_live());
    assert!(engine.pending_tenants().is_empty());
}

// ─── Per-version failure isolation ───────────────────────────────────────────

/// SQLite store whose `close_if_due` reports the database as busy for one
/// chosen version id.
struct BusyOnCloseStore {
    inner: SqliteTopologyStore,
    busy_version: Mutex<Option<String>>,
}

impl BusyOnCloseStore {
    fn new() -> Self {
        Self {
            inner: SqliteTopologyStore::open_in_memory().unwrap(),
            busy_version: Mutex::new(None),
        }
    }

    fn fail_close_of(&self, version_id: &str) {
        *self.busy_version.lock().unwrap() = Some(version_id.to_string());
    }
}

impl ITopologyStore for BusyOnCloseStore {
    fn insert_proxy(&self, proxy: &ProxyVertex) -> TopologyResult<bool> {
        self.inner.insert_proxy(proxy)
    }

    fn get_proxy(&self, id: &str) -> TopologyResult<Option<ProxyVertex>> {
        self.inner.get_proxy(id)
    }

    fn list_proxies(&self, tenant: &TenantShardKey) -> TopologyResult<Vec<ProxyVertex>> {
        self.inner.list_proxies(tenant)
    }

    fn latest_version(
        &self,
        tenant: &TenantShardKey,
        proxy_id: &str,
    ) -> TopologyResult<Option<VersionedEntity>> {
        self.inner.latest_version(tenant, proxy_id)
    }

    fn append_version(&self, append: &VersionAppend) -> TopologyResult<()> {
        self.inner.append_version(append)
    }

    fn close_if_due(
        &self,
        tenant: &TenantShardKey,
        version_id: &str,
        now: i64,
        cutoff: i64,
    ) -> TopologyResult<bool> {
        if self.busy_version.lock().unwrap().as_deref() == Some(version_id) {
            return Err(StorageError::Busy {
                message: "database is locked".into(),
            }
            .into());
        }
        self.inner.close_if_due(tenant, version_id, now, cutoff)
    }

    fn version_at(
        &self,
        tenant: &TenantShardKey,
        proxy_id: &str,
        t: i64,
    ) -> TopologyResult<Option<VersionedEntity>> {
        self.inner.version_at(tenant, proxy_id, t)
    }

    fn versions_for_proxy(
        &self,
        tenant: &TenantShardKey,
        proxy_id: &str,
    ) -> TopologyResult<Vec<VersionedEntity>> {
        self.inner.versions_for_proxy(tenant, proxy_id)
    }

    fn versions_for_tenant(&self, tenant: &TenantShardKey) -> TopologyResult<Vec<VersionedEntity>> {
        self.inner.versions_for_tenant(tenant)
    }

    fn live_versions_due(
        &self,
        entity_type: EntityType,
        cutoff: i64,
    ) -> TopologyResult<Vec<VersionedEntity>> {
        self.inner.live_versions_due(entity_type, cutoff)
    }

    fn versions_valid_at_page(
        &self,
        tenant: &TenantShardKey,
        entity_type: Option<EntityType>,
        at: i64,
        after_proxy: Option<&str>,
        limit: usize,
    ) -> TopologyResult<Vec<VersionedEntity>> {
        self.inner
            .versions_valid_at_page(tenant, entity_type, at, after_proxy, limit)
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
        self.inner
            .versions_overlapping_page(tenant, proxy_id, from, to, after_created, limit)
    }

    fn version_edges(&self, version_id: &str) -> TopologyResult<Vec<VersionEdge>> {
        self.inner.version_edges(version_id)
    }

    fn upsert_domain_edge(&self, edge: &DomainEdge) -> TopologyResult<DomainEdge> {
        self.inner.upsert_domain_edge(edge)
    }

    fn list_domain_edges(&self, tenant: &TenantShardKey) -> TopologyResult<Vec<DomainEdge>> {
        self.inner.list_domain_edges(tenant)
    }

    fn list_inbound_domain_edges(&self, tenant: &TenantShardKey) -> TopologyResult<Vec<DomainEdge>> {
        self.inner.list_inbound_domain_edges(tenant)
    }

    fn insert_bridging_edges(&self, edges: &[BridgingEdge]) -> TopologyResult<usize> {
        self.inner.insert_bridging_edges(edges)
    }

    fn list_bridging_edges(&self, tenant: &TenantShardKey) -> TopologyResult<Vec<BridgingEdge>> {
        self.inner.list_bridging_edges(tenant)
    }

    fn delete_bridging_edges(&self, tenant: &TenantShardKey) -> TopologyResult<usize> {
        self.inner.delete_bridging_edges(tenant)
    }

    fn delete_bridging_edges_by_key(
        &self,
        tenant: &TenantShardKey,
        keys: &[String],
    ) -> TopologyResult<usize> {
        self.inner.delete_bridging_edges_by_key(tenant, keys)
    }

    fn list_tenants(&self) -> TopologyResult<Vec<TenantShardKey>> {
        self.inner.list_tenants()
    }

    fn stats(&self) -> TopologyResult<StoreStats> {
        self.inner.stats()
    }

    fn health(&self) -> TopologyResult<StoreHealth> {
        self.inner.health()
    }
}

#[test]
fn one_failed_close_does_not_stop_the_sweep() {
    let store = Arc::new(BusyOnCloseStore::new());
    let mut config = TopologyConfig::default();
    config.ttl.set_ttl(EntityType::Device, 10);
    let e = TopologyEngine::with_store(config, store.clone()).unwrap();

    let versions: Vec<VersionedEntity> = ["d1", "d2", "d3"]
        .iter()
        .map(|id| {
            e.apply_mutation(&acme(), EntityType::Device, id, json!({}), 0)
                .unwrap()
        })
        .collect();
    let stuck = &versions[1];
    store.fail_close_of(&stuck.id);

    let report = e.sweep_expired(100).unwrap();
    assert_eq!(report.scanned, 3);
    assert_eq!(report.closed, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].version_id, stuck.id);
    assert_eq!(report.failures[0].proxy_id, stuck.proxy_id);
    assert!(report.failures[0].reason.contains("busy"));

    for v in [&versions[0], &versions[2]] {
        assert!(!e
            .live_status(&acme(), EntityType::Device, &v.external_id)
            .unwrap()
            .is_live());
    }
    assert!(e
        .live_status(&acme(), EntityType::Device, &stuck.external_id)
        .unwrap()
        .is_live());
}
