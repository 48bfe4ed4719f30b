//! ProxyVertexManager: stable In/Out identity per logical entity.
//!
//! Proxies are created on first observation and then never change. Their id
//! is unique across tenants, so a lookup that lands on another tenant's
//! proxy raises `TenantMismatch` instead of silently creating a twin.

mod locks;

pub use locks::ProxyLocks;

use std::sync::Arc;

use tracing::debug;

use topograph_core::config::TenancyConfig;
use topograph_core::models::{
    EntityType, LiveStatus, ProxyPair, ProxyRole, ProxyVertex, TenantShardKey,
};
use topograph_core::traits::ITopologyStore;
use topograph_core::{TopologyError, TopologyResult};

use crate::wall_clock;

pub struct ProxyVertexManager {
    store: Arc<dyn ITopologyStore>,
    tenancy: TenancyConfig,
}

impl ProxyVertexManager {
    pub fn new(store: Arc<dyn ITopologyStore>, tenancy: TenancyConfig) -> Self {
        Self { store, tenancy }
    }

    /// The tenant that owns entities of `entity_type` when addressed from
    /// `tenant`: the shared reference tenant for shared types, else `tenant`.
    pub fn owner_tenant(&self, tenant: &TenantShardKey, entity_type: EntityType) -> TenantShardKey {
        if self.tenancy.is_shared(entity_type) {
            TenantShardKey::shared()
        } else {
            tenant.clone()
        }
    }

    /// Idempotent. Persists only on the first call for a given key.
    pub fn get_or_create_proxy(
        &self,
        tenant: &TenantShardKey,
        entity_type: EntityType,
        external_id: &str,
        role: ProxyRole,
    ) -> TopologyResult<ProxyVertex> {
        if let Some(existing) = self.find_proxy(tenant, entity_type, external_id, role)? {
            return Ok(existing);
        }

        let owner = self.owner_tenant(tenant, entity_type);
        let proxy = ProxyVertex::new(owner, entity_type, external_id, role, wall_clock());
        if self.store.insert_proxy(&proxy)? {
            debug!(tenant = %proxy.tenant, proxy_id = %proxy.id, "created proxy");
            return Ok(proxy);
        }

        // Lost a creation race: whoever won decides the owner.
        self.find_proxy(tenant, entity_type, external_id, role)?
            .ok_or_else(|| TopologyError::NotFound {
                what: format!("proxy {}", proxy.id),
            })
    }

    /// Both roles of an entity. The `In` proxy owns the version chain.
    pub fn get_or_create_pair(
        &self,
        tenant: &TenantShardKey,
        entity_type: EntityType,
        external_id: &str,
    ) -> TopologyResult<ProxyPair> {
        Ok(ProxyPair {
            proxy_in: self.get_or_create_proxy(tenant, entity_type, external_id, ProxyRole::In)?,
            proxy_out: self.get_or_create_proxy(
                tenant,
                entity_type,
                external_id,
                ProxyRole::Out,
            )?,
        })
    }

    /// Pure lookup. Still raises `TenantMismatch` for another tenant's key.
    pub fn find_proxy(
        &self,
        tenant: &TenantShardKey,
        entity_type: EntityType,
        external_id: &str,
        role: ProxyRole,
    ) -> TopologyResult<Option<ProxyVertex>> {
        if external_id.trim().is_empty() {
            return Err(TopologyError::InvalidInput(format!(
                "{entity_type} external id must not be empty"
            )));
        }
        let id = ProxyVertex::make_id(entity_type, external_id, role);
        match self.store.get_proxy(&id)? {
            Some(existing) => {
                let owner = self.owner_tenant(tenant, entity_type);
                if existing.tenant != owner {
                    return Err(TopologyError::tenant_mismatch(
                        id,
                        owner.as_str(),
                        existing.tenant.as_str(),
                    ));
                }
                Ok(Some(existing))
            }
            None => Ok(None),
        }
    }

    /// Liveness derived from the entity's latest version.
    pub fn live_status(
        &self,
        tenant: &TenantShardKey,
        entity_type: EntityType,
        external_id: &str,
    ) -> TopologyResult<LiveStatus> {
        let Some(proxy_in) = self.find_proxy(tenant, entity_type, external_id, ProxyRole::In)?
        else {
            return Ok(LiveStatus::NeverVersioned);
        };
        Ok(match self.store.latest_version(&proxy_in.tenant, &proxy_in.id)? {
            None => LiveStatus::NeverVersioned,
            Some(v) if v.is_live() => LiveStatus::Live(v),
            Some(v) => LiveStatus::NoLiveVersion { last_closed: v },
        })
    }

    pub fn list(&self, tenant: &TenantShardKey) -> TopologyResult<Vec<ProxyVertex>> {
        self.store.list_proxies(tenant)
    }
}
