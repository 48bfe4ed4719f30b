//! TopologyEngine: the facade wiring every component over one store.
//!
//! Mutations and links only mark their tenant as pending. Connectivity is
//! reconciled afterwards by `enforce_connectivity`, `enforce_pending`, or the
//! background [`crate::SweepScheduler`].

use std::sync::Arc;

use dashmap::DashSet;
use tracing::{info, warn};

use topograph_core::config::TopologyConfig;
use topograph_core::models::{
    ConnectivityReport, DomainEdge, DomainEdgeSpec, EnforcementReport, EntityType, LiveStatus,
    SweepReport, TenantShardKey, VersionedEntity,
};
use topograph_core::traits::{ITopologyEngine, ITopologyStore};
use topograph_core::{TopologyError, TopologyResult};
use topograph_storage::SqliteTopologyStore;

use crate::connectivity::ConnectivityInvariantEnforcer;
use crate::edges::EdgeRewriter;
use crate::health::{self, HealthReport};
use crate::proxy::{ProxyLocks, ProxyVertexManager};
use crate::query::{TimeTravelQueryPlanner, VersionScan};
use crate::ttl::TtlExpirationEngine;
use crate::versioning::VersionChainBuilder;

/// Outcome of one scheduled maintenance run.
#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    pub sweep: SweepReport,
    pub tenants_enforced: usize,
    pub violations: usize,
}

pub struct TopologyEngine {
    config: TopologyConfig,
    store: Arc<dyn ITopologyStore>,
    proxies: Arc<ProxyVertexManager>,
    builder: VersionChainBuilder,
    rewriter: EdgeRewriter,
    enforcer: ConnectivityInvariantEnforcer,
    ttl: TtlExpirationEngine,
    planner: TimeTravelQueryPlanner,
    pending: DashSet<TenantShardKey>,
}

impl TopologyEngine {
    /// Validate `config` and open the SQLite store it names.
    pub fn new(config: TopologyConfig) -> TopologyResult<Self> {
        config.validate()?;
        let store = Arc::new(SqliteTopologyStore::from_config(&config.storage)?);
        Self::with_store(config, store)
    }

    /// In-memory store with default configuration.
    pub fn in_memory() -> TopologyResult<Self> {
        Self::new(TopologyConfig::default())
    }

    /// Validate `config` and wire the engine over an existing store.
    pub fn with_store(
        config: TopologyConfig,
        store: Arc<dyn ITopologyStore>,
    ) -> TopologyResult<Self> {
        config.validate()?;
        let locks = Arc::new(ProxyLocks::new());
        let proxies = Arc::new(ProxyVertexManager::new(
            store.clone(),
            config.tenancy.clone(),
        ));
        Ok(Self {
            builder: VersionChainBuilder::new(store.clone(), proxies.clone(), locks.clone()),
            rewriter: EdgeRewriter::new(store.clone(), proxies.clone()),
            enforcer: ConnectivityInvariantEnforcer::new(
                store.clone(),
                config.connectivity.clone(),
            ),
            ttl: TtlExpirationEngine::new(store.clone(), locks, config.ttl.clone()),
            planner: TimeTravelQueryPlanner::new(store.clone(), proxies.clone(), config.query.clone()),
            pending: DashSet::new(),
            proxies,
            store,
            config,
        })
    }

    pub fn config(&self) -> &TopologyConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ITopologyStore> {
        &self.store
    }

    /// Apply several mutations of one tenant in order. Stops at the first failure.
    pub fn apply_batch(
        &self,
        tenant: &TenantShardKey,
        mutations: Vec<(EntityType, String, serde_json::Value, i64)>,
    ) -> TopologyResult<Vec<VersionedEntity>> {
        let result = self.builder.apply_batch(tenant, mutations);
        // Earlier items may have landed even when a later one failed.
        self.pending.insert(tenant.clone());
        for version in result.iter().flatten() {
            if version.tenant != *tenant {
                self.pending.insert(version.tenant.clone());
            }
        }
        result
    }

    /// Every entity's state at `t`, lazily paged.
    pub fn states_as_of(
        &self,
        tenant: &TenantShardKey,
        entity_type: Option<EntityType>,
        t: i64,
    ) -> VersionScan {
        self.planner.states_as_of(tenant, entity_type, t)
    }

    pub fn versions_in_interval(
        &self,
        tenant: &TenantShardKey,
        entity_type: EntityType,
        external_id: &str,
        from: i64,
        to: i64,
    ) -> TopologyResult<VersionScan> {
        self.planner
            .versions_in_interval(tenant, entity_type, external_id, from, to)
    }

    pub fn live_status(
        &self,
        tenant: &TenantShardKey,
        entity_type: EntityType,
        external_id: &str,
    ) -> TopologyResult<LiveStatus> {
        self.proxies.live_status(tenant, entity_type, external_id)
    }

    pub fn domain_edges(&self, tenant: &TenantShardKey) -> TopologyResult<Vec<DomainEdge>> {
        self.rewriter.domain_edges(tenant)
    }

    pub fn connectivity_report(&self, tenant: &TenantShardKey) -> TopologyResult<ConnectivityReport> {
        self.enforcer.connectivity_report(tenant)
    }

    pub fn orphans(&self, tenant: &TenantShardKey) -> TopologyResult<Vec<String>> {
        self.enforcer.orphans(tenant)
    }

    /// Drop and recreate all bridging edges of a tenant.
    pub fn rebuild_connectivity(&self, tenant: &TenantShardKey) -> TopologyResult<EnforcementReport> {
        self.pending.remove(tenant);
        self.enforcer.rebuild(tenant)
    }

    /// Tenants awaiting enforcement, sorted.
    pub fn pending_tenants(&self) -> Vec<TenantShardKey> {
        let mut tenants: Vec<TenantShardKey> = self.pending.iter().map(|t| t.key().clone()).collect();
        tenants.sort();
        tenants
    }

    /// Enforce every pending tenant. A violation is logged and counted, and
    /// the tenant is not retried until it is mutated again. Any other error
    /// puts the tenant back and is returned after the remaining tenants ran.
    pub fn enforce_pending(&self) -> TopologyResult<(usize, usize)> {
        let mut enforced = 0;
        let mut violations = 0;
        let mut first_error = None;

        for tenant in self.pending_tenants() {
            self.pending.remove(&tenant);
            match self.enforcer.enforce(&tenant) {
                Ok(_) => enforced += 1,
                Err(TopologyError::ConnectivityInvariantViolation { orphans, .. }) => {
                    warn!(tenant = %tenant, orphans = orphans.len(), "tenant left with orphans");
                    violations += 1;
                }
                Err(e) => {
                    warn!(tenant = %tenant, error = %e, "enforcement failed, will retry");
                    self.pending.insert(tenant);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok((enforced, violations)),
        }
    }

    /// TTL sweep at `now`, then reconciliation of pending tenants.
    pub fn run_maintenance(&self, now: i64) -> TopologyResult<MaintenanceReport> {
        let sweep = self.ttl.sweep(now)?;
        let (tenants_enforced, violations) = self.enforce_pending()?;
        info!(
            now,
            closed = sweep.closed,
            tenants_enforced,
            violations,
            "maintenance complete"
        );
        Ok(MaintenanceReport {
            sweep,
            tenants_enforced,
            violations,
        })
    }

    pub fn health_check(&self) -> HealthReport {
        health::run_checks(self.store.as_ref(), self.pending.len())
    }
}

impl ITopologyEngine for TopologyEngine {
    fn apply_mutation(
        &self,
        tenant: &TenantShardKey,
        entity_type: EntityType,
        external_id: &str,
        payload: serde_json::Value,
        timestamp: i64,
    ) -> TopologyResult<VersionedEntity> {
        let version = self
            .builder
            .apply_mutation(tenant, entity_type, external_id, payload, timestamp)?;
        self.pending.insert(version.tenant.clone());
        Ok(version)
    }

    fn state_as_of(
        &self,
        tenant: &TenantShardKey,
        entity_type: EntityType,
        external_id: &str,
        timestamp: i64,
    ) -> TopologyResult<VersionedEntity> {
        self.planner
            .state_as_of(tenant, entity_type, external_id, timestamp)
    }

    fn sweep_expired(&self, now: i64) -> TopologyResult<SweepReport> {
        self.ttl.sweep(now)
    }

    fn enforce_connectivity(&self, tenant: &TenantShardKey) -> TopologyResult<EnforcementReport> {
        self.pending.remove(tenant);
        self.enforcer.enforce(tenant)
    }

    fn link(&self, spec: DomainEdgeSpec) -> TopologyResult<DomainEdge> {
        let target_owner = self.proxies.owner_tenant(&spec.tenant, spec.to.entity_type);
        let edge = self.rewriter.retarget(spec)?;
        self.pending.insert(edge.tenant.clone());
        if target_owner != edge.tenant {
            self.pending.insert(target_owner);
        }
        Ok(edge)
    }

    fn history(
        &self,
        tenant: &TenantShardKey,
        entity_type: EntityType,
        external_id: &str,
    ) -> TopologyResult<Vec<VersionedEntity>> {
        self.builder
            .version_history(tenant, entity_type, external_id)
    }
}
