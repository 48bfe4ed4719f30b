use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{EntityRef, EntityType, TenantShardKey};
use crate::errors::TopologyError;

/// Direction of a `hasVersion` edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionEdgeDirection {
    /// `ProxyIn → version`
    ProxyToVersion,
    /// `version → ProxyOut`
    VersionToProxy,
}

impl VersionEdgeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProxyToVersion => "proxy_to_version",
            Self::VersionToProxy => "version_to_proxy",
        }
    }
}

impl FromStr for VersionEdgeDirection {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proxy_to_version" => Ok(Self::ProxyToVersion),
            "version_to_proxy" => Ok(Self::VersionToProxy),
            other => Err(TopologyError::InvalidInput(format!(
                "unknown version edge direction '{other}'"
            ))),
        }
    }
}

/// `hasVersion`: history edge between a proxy and one of its snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEdge {
    pub tenant: TenantShardKey,
    pub from_id: String,
    pub to_id: String,
    pub version_id: String,
    pub direction: VersionEdgeDirection,
    pub created_at: i64,
}

/// Semantically load-bearing relationship kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DomainEdgeKind {
    /// Real network link, device to device.
    #[serde(rename = "hasConnection")]
    HasConnection,
    #[serde(rename = "hasDeviceSoftware")]
    HasDeviceSoftware,
    #[serde(rename = "hasLocation")]
    HasLocation,
}

impl DomainEdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HasConnection => "hasConnection",
            Self::HasDeviceSoftware => "hasDeviceSoftware",
            Self::HasLocation => "hasLocation",
        }
    }

    pub fn source_type(&self) -> EntityType {
        EntityType::Device
    }

    pub fn target_type(&self) -> EntityType {
        match self {
            Self::HasConnection => EntityType::Device,
            Self::HasDeviceSoftware => EntityType::Software,
            Self::HasLocation => EntityType::Location,
        }
    }
}

impl fmt::Display for DomainEdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainEdgeKind {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hasConnection" => Ok(Self::HasConnection),
            "hasDeviceSoftware" => Ok(Self::HasDeviceSoftware),
            "hasLocation" => Ok(Self::HasLocation),
            other => Err(TopologyError::InvalidInput(format!(
                "unknown domain edge kind '{other}'"
            ))),
        }
    }
}

/// Caller-side request for a domain edge, expressed with logical references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEdgeSpec {
    pub tenant: TenantShardKey,
    pub kind: DomainEdgeKind,
    pub from: EntityRef,
    pub to: EntityRef,
    #[serde(default)]
    pub attributes: serde_json::Value,
}

impl DomainEdgeSpec {
    pub fn new(
        tenant: TenantShardKey,
        kind: DomainEdgeKind,
        from: EntityRef,
        to: EntityRef,
    ) -> Self {
        Self {
            tenant,
            kind,
            from,
            to,
            attributes: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn with_attributes(mut self, attributes: serde_json::Value) -> Self {
        self.attributes = attributes;
        self
    }
}

/// A persisted domain edge: always `ProxyOut → ProxyIn`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEdge {
    pub id: String,
    pub tenant: TenantShardKey,
    pub kind: DomainEdgeKind,
    pub from_proxy: String,
    pub to_proxy: String,
    pub attributes: serde_json::Value,
    pub created_at: i64,
}

impl DomainEdge {
    pub fn make_id(kind: DomainEdgeKind, from_proxy: &str, to_proxy: &str) -> String {
        format!("{}:{}->{}", kind.as_str(), from_proxy, to_proxy)
    }
}

/// Discriminator for synthetic connectivity edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BridgeType {
    /// Consecutive versions of one entity, `ProxyOut → ProxyIn`.
    TemporalSequence,
    /// Sparse `(i + j) mod K` coverage inside one domain.
    ProxyNetwork(EntityType),
    /// `i`-th Out proxy of one domain to `i`-th Out proxy of another.
    CrossDomainProxy,
    /// Repair edge added after a failed postcondition scan.
    OrphanFallback,
}

impl BridgeType {
    pub fn as_string(&self) -> String {
        match self {
            Self::TemporalSequence => "temporal_sequence".to_string(),
            Self::ProxyNetwork(domain) => format!("{}_proxy_network", domain.as_str()),
            Self::CrossDomainProxy => "cross_domain_proxy".to_string(),
            Self::OrphanFallback => "orphan_fallback".to_string(),
        }
    }
}

impl fmt::Display for BridgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl FromStr for BridgeType {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "temporal_sequence" => Ok(Self::TemporalSequence),
            "cross_domain_proxy" => Ok(Self::CrossDomainProxy),
            "orphan_fallback" => Ok(Self::OrphanFallback),
            other => match other.strip_suffix("_proxy_network") {
                Some(domain) => Ok(Self::ProxyNetwork(domain.parse()?)),
                None => Err(TopologyError::InvalidInput(format!(
                    "unknown connection type '{other}'"
                ))),
            },
        }
    }
}

/// Synthetic edge that exists only to satisfy the no-orphan invariant.
///
/// Never a functional relationship: consumers must filter on
/// `connection_type` and never read these as network or software topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgingEdge {
    /// Deterministic identity; re-creating the same bridge is a no-op.
    pub bridge_key: String,
    pub tenant: TenantShardKey,
    #[serde(with = "bridge_type_serde")]
    pub connection_type: BridgeType,
    pub from_proxy: String,
    pub to_proxy: String,
    pub attributes: serde_json::Value,
    pub created_at: i64,
}

mod bridge_type_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::BridgeType;

    pub fn serialize<S: Serializer>(value: &BridgeType, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.as_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BridgeType, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
