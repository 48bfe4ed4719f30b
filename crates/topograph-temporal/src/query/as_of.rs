//! TimeTravelQueryPlanner: read-only point and range queries over chains.

use std::sync::Arc;

use tracing::debug;

use topograph_core::config::QueryConfig;
use topograph_core::models::{EntityType, ProxyRole, TenantShardKey, VersionedEntity};
use topograph_core::traits::ITopologyStore;
use topograph_core::{TopologyError, TopologyResult};

use super::scan::VersionScan;
use crate::proxy::ProxyVertexManager;

pub struct TimeTravelQueryPlanner {
    store: Arc<dyn ITopologyStore>,
    proxies: Arc<ProxyVertexManager>,
    config: QueryConfig,
}

impl TimeTravelQueryPlanner {
    pub fn new(
        store: Arc<dyn ITopologyStore>,
        proxies: Arc<ProxyVertexManager>,
        config: QueryConfig,
    ) -> Self {
        Self {
            store,
            proxies,
            config,
        }
    }

    /// The version with `created <= t < expired`, or `NotFound`.
    pub fn state_as_of(
        &self,
        tenant: &TenantShardKey,
        entity_type: EntityType,
        external_id: &str,
        t: i64,
    ) -> TopologyResult<VersionedEntity> {
        let proxy_in = self
            .proxies
            .find_proxy(tenant, entity_type, external_id, ProxyRole::In)?
            .ok_or_else(|| TopologyError::NotFound {
                what: format!("{entity_type}/{external_id}"),
            })?;

        let version = self
            .store
            .version_at(&proxy_in.tenant, &proxy_in.id, t)?
            .ok_or_else(|| TopologyError::NotFound {
                what: format!("{entity_type}/{external_id} as of {t}"),
            })?;
        debug!(tenant = %tenant, proxy_id = %proxy_in.id, t, version_id = %version.id, "as-of resolved");
        Ok(version)
    }

    /// Every proxy's state at `t` within the tenant, optionally one type only.
    pub fn states_as_of(
        &self,
        tenant: &TenantShardKey,
        entity_type: Option<EntityType>,
        t: i64,
    ) -> VersionScan {
        VersionScan::valid_at(
            self.store.clone(),
            tenant.clone(),
            entity_type,
            t,
            self.config.page_size,
        )
    }

    /// Versions of one entity overlapping `[from, to)`. Unknown entities
    /// yield an empty scan.
    pub fn versions_in_interval(
        &self,
        tenant: &TenantShardKey,
        entity_type: EntityType,
        external_id: &str,
        from: i64,
        to: i64,
    ) -> TopologyResult<VersionScan> {
        if from >= to {
            return Err(TopologyError::InvalidInput(format!(
                "interval [{from}, {to}) is empty"
            )));
        }
        Ok(
            match self
                .proxies
                .find_proxy(tenant, entity_type, external_id, ProxyRole::In)?
            {
                Some(proxy_in) => VersionScan::overlapping(
                    self.store.clone(),
                    proxy_in.tenant,
                    proxy_in.id,
                    from,
                    to,
                    self.config.page_size,
                ),
                None => VersionScan::empty(self.store.clone(), tenant.clone()),
            },
        )
    }
}
