use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::TopologyError;

/// Domain of a logical entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Device,
    Software,
    Location,
}

impl EntityType {
    pub const ALL: [EntityType; 3] = [Self::Device, Self::Software, Self::Location];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Device => "device",
            Self::Software => "software",
            Self::Location => "location",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "device" => Ok(Self::Device),
            "software" => Ok(Self::Software),
            "location" => Ok(Self::Location),
            other => Err(TopologyError::InvalidInput(format!(
                "unknown entity type '{other}'"
            ))),
        }
    }
}

/// Which side of the identity pair a proxy represents.
///
/// Structural edges leave an entity through its `Out` proxy and enter
/// through its `In` proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyRole {
    In,
    Out,
}

impl ProxyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Self::In => Self::Out,
            Self::Out => Self::In,
        }
    }
}

impl fmt::Display for ProxyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProxyRole {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(Self::In),
            "out" => Ok(Self::Out),
            other => Err(TopologyError::InvalidInput(format!(
                "unknown proxy role '{other}'"
            ))),
        }
    }
}

/// A logical reference to an entity by domain and external id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: EntityType,
    pub external_id: String,
}

impl EntityRef {
    pub fn new(entity_type: EntityType, external_id: impl Into<String>) -> Self {
        Self {
            entity_type,
            external_id: external_id.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity_type, self.external_id)
    }
}
