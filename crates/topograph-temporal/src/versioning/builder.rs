//! VersionChainBuilder: compare-and-close-then-append, atomic per proxy.
//!
//! Under the proxy's lock: read the latest version, reject non-monotonic
//! timestamps, then hand the store one `VersionAppend` that closes the live
//! version and inserts its successor in a single transaction.

use std::sync::Arc;

use tracing::{debug, info};

use topograph_core::models::{
    EntityType, ProxyPair, ProxyRole, TenantShardKey, VersionedEntity, MAX_TIMESTAMP,
};
use topograph_core::traits::{ITopologyStore, VersionAppend};
use topograph_core::{TopologyError, TopologyResult};

use crate::proxy::{ProxyLocks, ProxyVertexManager};
use crate::wall_clock;

/// Reject `as_of` values that would overlap or precede the current chain.
///
/// A live latest version must start strictly before `as_of`; a closed latest
/// version must have ended at or before `as_of`.
pub fn check_monotonic(
    proxy_id: &str,
    latest: Option<&VersionedEntity>,
    as_of: i64,
) -> TopologyResult<()> {
    if as_of == MAX_TIMESTAMP {
        return Err(TopologyError::InvalidInput(format!(
            "mutation of {proxy_id} at MAX_TIMESTAMP would create an empty interval"
        )));
    }
    let Some(latest) = latest else {
        return Ok(());
    };
    let bound = if latest.is_live() {
        (as_of <= latest.created()).then_some(latest.created())
    } else {
        (as_of < latest.expired()).then_some(latest.expired())
    };
    match bound {
        Some(current) => Err(TopologyError::NonMonotonicTime {
            proxy_id: proxy_id.to_string(),
            current,
            requested: as_of,
        }),
        None => Ok(()),
    }
}

pub struct VersionChainBuilder {
    store: Arc<dyn ITopologyStore>,
    proxies: Arc<ProxyVertexManager>,
    locks: Arc<ProxyLocks>,
}

impl VersionChainBuilder {
    pub fn new(
        store: Arc<dyn ITopologyStore>,
        proxies: Arc<ProxyVertexManager>,
        locks: Arc<ProxyLocks>,
    ) -> Self {
        Self {
            store,
            proxies,
            locks,
        }
    }

    /// Resolve (or create) the entity's proxies and append a version at `as_of`.
    pub fn apply_mutation(
        &self,
        tenant: &TenantShardKey,
        entity_type: EntityType,
        external_id: &str,
        payload: serde_json::Value,
        as_of: i64,
    ) -> TopologyResult<VersionedEntity> {
        let pair = self
            .proxies
            .get_or_create_pair(tenant, entity_type, external_id)?;
        self.append(&pair, payload, as_of)
    }

    /// Append a version to an already-resolved proxy pair.
    ///
    /// Identical payloads still produce a new version.
    pub fn append(
        &self,
        pair: &ProxyPair,
        payload: serde_json::Value,
        as_of: i64,
    ) -> TopologyResult<VersionedEntity> {
        let owner = pair.tenant().clone();
        let proxy_id = pair.owner_id();

        let version = self.locks.with_lock(proxy_id, || {
            let latest = self.store.latest_version(&owner, proxy_id)?;
            check_monotonic(proxy_id, latest.as_ref(), as_of)?;

            let version = VersionedEntity::new_live(
                owner.clone(),
                proxy_id,
                pair.proxy_in.entity_type,
                pair.proxy_in.external_id.clone(),
                as_of,
                payload,
            )?;
            let close_live = latest.filter(|v| v.is_live()).map(|v| v.id);
            self.store.append_version(&VersionAppend {
                close_live,
                version: version.clone(),
                proxy_out_id: pair.proxy_out.id.clone(),
                recorded_at: wall_clock(),
            })?;
            Ok::<_, TopologyError>(version)
        })?;

        debug!(
            tenant = %owner,
            proxy_id = %proxy_id,
            version_id = %version.id,
            as_of,
            "version appended"
        );
        Ok(version)
    }

    /// Apply a batch of mutations in order. Stops at the first failure.
    pub fn apply_batch(
        &self,
        tenant: &TenantShardKey,
        mutations: Vec<(EntityType, String, serde_json::Value, i64)>,
    ) -> TopologyResult<Vec<VersionedEntity>> {
        let mut applied = Vec::with_capacity(mutations.len());
        for (entity_type, external_id, payload, as_of) in mutations {
            applied.push(self.apply_mutation(tenant, entity_type, &external_id, payload, as_of)?);
        }
        info!(tenant = %tenant, applied = applied.len(), "mutation batch applied");
        Ok(applied)
    }

    /// Full chain ordered by `created`. Empty for unknown entities.
    pub fn version_history(
        &self,
        tenant: &TenantShardKey,
        entity_type: EntityType,
        external_id: &str,
    ) -> TopologyResult<Vec<VersionedEntity>> {
        match self
            .proxies
            .find_proxy(tenant, entity_type, external_id, ProxyRole::In)?
        {
            Some(proxy_in) => self.store.versions_for_proxy(&proxy_in.tenant, &proxy_in.id),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topograph_core::models::CloseReason;

    fn live(created: i64) -> VersionedEntity {
        VersionedEntity::new_live(
            TenantShardKey::new("acme").unwrap(),
            "device_proxy_in/42",
            EntityType::Device,
            "42",
            created,
            serde_json::json!({}),
        )
        .unwrap()
    }

    #[test]
    fn first_version_accepts_any_finite_time() {
        assert!(check_monotonic("p", None, -5).is_ok());
        assert!(check_monotonic("p", None, MAX_TIMESTAMP).is_err());
    }

    #[test]
    fn live_latest_requires_strictly_later_time() {
        let v = live(100);
        assert!(matches!(
            check_monotonic("p", Some(&v), 50),
            Err(TopologyError::NonMonotonicTime { current: 100, requested: 50, .. })
        ));
        assert!(check_monotonic("p", Some(&v), 100).is_err());
        assert!(check_monotonic("p", Some(&v), 101).is_ok());
    }

    #[test]
    fn closed_latest_requires_time_past_its_end() {
        let mut v = live(100);
        v.record.expired = 160;
        v.close_reason = Some(CloseReason::Expired);
        assert!(check_monotonic("p", Some(&v), 150).is_err());
        assert!(check_monotonic("p", Some(&v), 160).is_ok());
    }
}
