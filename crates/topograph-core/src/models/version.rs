use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{EntityType, TenantShardKey};
use crate::errors::{TopologyError, TopologyResult};

/// Sentinel `expired` value meaning "currently live".
pub const MAX_TIMESTAMP: i64 = i64::MAX;

/// Versioned-attribute envelope: `[created, expired)` plus the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalRecord {
    /// Inclusive lower bound, epoch seconds.
    pub created: i64,
    /// Exclusive upper bound; `MAX_TIMESTAMP` while live.
    pub expired: i64,
    pub payload: serde_json::Value,
}

impl TemporalRecord {
    /// A live record starting at `created`.
    pub fn live(created: i64, payload: serde_json::Value) -> TopologyResult<Self> {
        let record = Self {
            created,
            expired: MAX_TIMESTAMP,
            payload,
        };
        record.validate()?;
        Ok(record)
    }

    /// Zero-length and inverted intervals are rejected.
    pub fn validate(&self) -> TopologyResult<()> {
        if self.created >= self.expired {
            return Err(TopologyError::InvalidInput(format!(
                "interval [{}, {}) is empty",
                self.created, self.expired
            )));
        }
        Ok(())
    }

    pub fn is_live(&self) -> bool {
        self.expired == MAX_TIMESTAMP
    }

    /// `created <= t < expired`.
    pub fn contains(&self, t: i64) -> bool {
        self.created <= t && t < self.expired
    }

    /// Overlap with the half-open interval `[from, to)`.
    pub fn overlaps(&self, from: i64, to: i64) -> bool {
        self.created < to && self.expired > from
    }
}

/// Why a version stopped being live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// Replaced by a newer version.
    Superseded,
    /// Aged out by a TTL sweep.
    Expired,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Superseded => "superseded",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CloseReason {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "superseded" => Ok(Self::Superseded),
            "expired" => Ok(Self::Expired),
            other => Err(TopologyError::InvalidInput(format!(
                "unknown close reason '{other}'"
            ))),
        }
    }
}

/// Live/Closed transition of the current-version pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionState {
    Live,
    Closed {
        at: i64,
        reason: Option<CloseReason>,
    },
}

/// One immutable timestamped snapshot of an entity's attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedEntity {
    pub id: String,
    pub tenant: TenantShardKey,
    /// The owning `In` proxy.
    pub proxy_id: String,
    pub entity_type: EntityType,
    pub external_id: String,
    pub record: TemporalRecord,
    pub close_reason: Option<CloseReason>,
}

impl VersionedEntity {
    /// A new live version with a fresh UUID.
    pub fn new_live(
        tenant: TenantShardKey,
        proxy_id: impl Into<String>,
        entity_type: EntityType,
        external_id: impl Into<String>,
        created: i64,
        payload: serde_json::Value,
    ) -> TopologyResult<Self> {
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            tenant,
            proxy_id: proxy_id.into(),
            entity_type,
            external_id: external_id.into(),
            record: TemporalRecord::live(created, payload)?,
            close_reason: None,
        })
    }

    pub fn created(&self) -> i64 {
        self.record.created
    }

    pub fn expired(&self) -> i64 {
        self.record.expired
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.record.payload
    }

    pub fn is_live(&self) -> bool {
        self.record.is_live()
    }

    pub fn state(&self) -> VersionState {
        if self.record.is_live() {
            VersionState::Live
        } else {
            VersionState::Closed {
                at: self.record.expired,
                reason: self.close_reason,
            }
        }
    }
}
