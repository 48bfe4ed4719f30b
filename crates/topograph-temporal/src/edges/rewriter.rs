//! EdgeRewriter: resolves domain edges onto proxies.
//!
//! Callers speak in logical references (`device/42 hasLocation location/hq`).
//! The rewriter lands every edge on `source ProxyOut → target ProxyIn`, so
//! edges survive any number of version appends without being rewritten.

use std::sync::Arc;

use tracing::debug;

use topograph_core::models::{
    DomainEdge, DomainEdgeSpec, EntityRef, EntityType, ProxyRole, TenantShardKey,
};
use topograph_core::traits::ITopologyStore;
use topograph_core::{TopologyError, TopologyResult};

use crate::proxy::ProxyVertexManager;
use crate::wall_clock;

pub struct EdgeRewriter {
    store: Arc<dyn ITopologyStore>,
    proxies: Arc<ProxyVertexManager>,
}

impl EdgeRewriter {
    pub fn new(store: Arc<dyn ITopologyStore>, proxies: Arc<ProxyVertexManager>) -> Self {
        Self { store, proxies }
    }

    /// Persist `spec` idempotently on `(kind, from, to)`, creating missing proxies.
    pub fn retarget(&self, spec: DomainEdgeSpec) -> TopologyResult<DomainEdge> {
        let kind = spec.kind;
        check_reference(&spec.from, kind.source_type(), kind.as_str(), "source")?;
        check_reference(&spec.to, kind.target_type(), kind.as_str(), "target")?;

        let attributes = match spec.attributes {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            obj @ serde_json::Value::Object(_) => obj,
            other => {
                return Err(TopologyError::InvalidInput(format!(
                    "{kind} attributes must be a JSON object, got {other}"
                )))
            }
        };

        // Surface foreign endpoints before creating anything.
        for (reference, role) in [(&spec.from, ProxyRole::Out), (&spec.to, ProxyRole::In)] {
            self.proxies.find_proxy(
                &spec.tenant,
                reference.entity_type,
                &reference.external_id,
                role,
            )?;
        }

        let from = self.proxies.get_or_create_proxy(
            &spec.tenant,
            spec.from.entity_type,
            &spec.from.external_id,
            ProxyRole::Out,
        )?;
        let to = self.proxies.get_or_create_proxy(
            &spec.tenant,
            spec.to.entity_type,
            &spec.to.external_id,
            ProxyRole::In,
        )?;

        if from.tenant != to.tenant && !to.tenant.is_shared() {
            return Err(TopologyError::tenant_mismatch(
                DomainEdge::make_id(kind, &from.id, &to.id),
                from.tenant.as_str(),
                to.tenant.as_str(),
            ));
        }

        let edge = DomainEdge {
            id: DomainEdge::make_id(kind, &from.id, &to.id),
            tenant: from.tenant.clone(),
            kind,
            from_proxy: from.id,
            to_proxy: to.id,
            attributes,
            created_at: wall_clock(),
        };
        let stored = self.store.upsert_domain_edge(&edge)?;
        debug!(tenant = %stored.tenant, edge_id = %stored.id, "domain edge linked");
        Ok(stored)
    }

    /// Domain edges only; bridging edges are never returned here.
    pub fn domain_edges(&self, tenant: &TenantShardKey) -> TopologyResult<Vec<DomainEdge>> {
        self.store.list_domain_edges(tenant)
    }
}

fn check_reference(
    reference: &EntityRef,
    expected: EntityType,
    kind: &str,
    side: &str,
) -> TopologyResult<()> {
    if reference.external_id.trim().is_empty() {
        return Err(TopologyError::unresolved(
            reference.to_string(),
            "empty external id",
        ));
    }
    if reference.entity_type != expected {
        return Err(TopologyError::unresolved(
            reference.to_string(),
            format!("{kind} expects a {expected} {side}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use topograph_core::config::TenancyConfig;
    use topograph_core::errors::RecoveryAction;
    use topograph_core::models::DomainEdgeKind;
    use topograph_storage::SqliteTopologyStore;

    fn rewriter() -> EdgeRewriter {
        let store: Arc<dyn ITopologyStore> = Arc::new(SqliteTopologyStore::open_in_memory().unwrap());
        let proxies = Arc::new(ProxyVertexManager::new(store.clone(), TenancyConfig::default()));
        EdgeRewriter::new(store, proxies)
    }

    fn acme() -> TenantShardKey {
        TenantShardKey::new("acme").unwrap()
    }

    #[test]
    fn edges_land_on_out_and_in_proxies() {
        let r = rewriter();
        let edge = r
            .retarget(DomainEdgeSpec::new(
                acme(),
                DomainEdgeKind::HasDeviceSoftware,
                EntityRef::new(EntityType::Device, "42"),
                EntityRef::new(EntityType::Software, "openssh"),
            ))
            .unwrap();
        assert_eq!(edge.from_proxy, "device_proxy_out/42");
        assert_eq!(edge.to_proxy, "software_proxy_in/openssh");
        assert_eq!(edge.attributes, serde_json::json!({}));
    }

    #[test]
    fn wrong_endpoint_type_is_unresolved() {
        let r = rewriter();
        let err = r
            .retarget(DomainEdgeSpec::new(
                acme(),
                DomainEdgeKind::HasLocation,
                EntityRef::new(EntityType::Device, "42"),
                EntityRef::new(EntityType::Software, "openssh"),
            ))
            .unwrap_err();
        assert!(matches!(err, TopologyError::UnresolvedEntityReference { .. }));
        assert_eq!(RecoveryAction::for_error(&err), RecoveryAction::Fallback);
    }

    #[test]
    fn empty_reference_is_unresolved() {
        let r = rewriter();
        let err = r
            .retarget(DomainEdgeSpec::new(
                acme(),
                DomainEdgeKind::HasConnection,
                EntityRef::new(EntityType::Device, ""),
                EntityRef::new(EntityType::Device, "7"),
            ))
            .unwrap_err();
        assert!(matches!(err, TopologyError::UnresolvedEntityReference { .. }));
    }

    #[test]
    fn non_object_attributes_are_rejected() {
        let r = rewriter();
        let err = r
            .retarget(
                DomainEdgeSpec::new(
                    acme(),
                    DomainEdgeKind::HasConnection,
                    EntityRef::new(EntityType::Device, "1"),
                    EntityRef::new(EntityType::Device, "2"),
                )
                .with_attributes(serde_json::json!([1, 2])),
            )
            .unwrap_err();
        assert!(matches!(err, TopologyError::InvalidInput(_)));
    }
}
