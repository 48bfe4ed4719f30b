use serde::{Deserialize, Serialize};

use super::{EntityRef, EntityType, ProxyRole, TenantShardKey, VersionedEntity};

/// Stable identity anchor for one role of a logical entity.
///
/// Created once, never mutated, never deleted. Every structural edge points
/// at a proxy, never at a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyVertex {
    pub id: String,
    pub tenant: TenantShardKey,
    pub entity_type: EntityType,
    pub external_id: String,
    pub role: ProxyRole,
    /// Wall-clock epoch seconds of first observation.
    pub created_at: i64,
}

impl ProxyVertex {
    pub fn new(
        tenant: TenantShardKey,
        entity_type: EntityType,
        external_id: impl Into<String>,
        role: ProxyRole,
        created_at: i64,
    ) -> Self {
        let external_id = external_id.into();
        Self {
            id: Self::make_id(entity_type, &external_id, role),
            tenant,
            entity_type,
            external_id,
            role,
            created_at,
        }
    }

    /// Physical key, unique across tenants: `device_proxy_in/42`.
    pub fn make_id(entity_type: EntityType, external_id: &str, role: ProxyRole) -> String {
        format!("{}_proxy_{}/{}", entity_type.as_str(), role.as_str(), external_id)
    }

    /// Id of the other role of the same entity.
    pub fn partner_id(&self) -> String {
        Self::make_id(self.entity_type, &self.external_id, self.role.opposite())
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.entity_type, self.external_id.clone())
    }
}

/// Both roles of one logical entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyPair {
    pub proxy_in: ProxyVertex,
    pub proxy_out: ProxyVertex,
}

impl ProxyPair {
    /// Versions are owned by the `In` proxy.
    pub fn owner_id(&self) -> &str {
        &self.proxy_in.id
    }

    pub fn tenant(&self) -> &TenantShardKey {
        &self.proxy_in.tenant
    }
}

/// Observed liveness of a proxy, derived from its version chain.
///
/// Proxies themselves are immutable; "no live version" after a TTL sweep
/// is reported here rather than written onto the proxy.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveStatus {
    Live(VersionedEntity),
    NoLiveVersion { last_closed: VersionedEntity },
    NeverVersioned,
}

impl LiveStatus {
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live(_))
    }
}
