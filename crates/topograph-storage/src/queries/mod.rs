//! Raw query modules plus the row decoding they share.
//!
//! Rows are read into `Raw*` structs inside rusqlite closures and decoded
//! into model types afterwards, so a malformed enum column surfaces as
//! `StorageError::CorruptRow` instead of a rusqlite conversion error.

pub mod bridging_ops;
pub mod domain_edge_ops;
pub mod proxy_ops;
pub mod scan_ops;
pub mod stats_ops;
pub mod version_ops;

use std::str::FromStr;

use rusqlite::{Connection, Row};

use topograph_core::errors::StorageError;
use topograph_core::models::{
    BridgingEdge, DomainEdge, ProxyVertex, TemporalRecord, TenantShardKey, VersionedEntity,
};
use topograph_core::{TopologyError, TopologyResult};

use crate::to_storage_err;

/// Run `f` inside `BEGIN IMMEDIATE … COMMIT`, rolling back on any error.
pub fn with_immediate_tx<T, F>(conn: &Connection, f: F) -> TopologyResult<T>
where
    F: FnOnce(&Connection) -> TopologyResult<T>,
{
    conn.execute_batch("BEGIN IMMEDIATE").map_err(to_storage_err)?;
    let outcome = f(conn).and_then(|value| {
        conn.execute_batch("COMMIT").map_err(to_storage_err)?;
        Ok(value)
    });
    if outcome.is_err() {
        let _ = conn.execute_batch("ROLLBACK");
    }
    outcome
}

fn parse_column<T>(table: &str, column: &str, raw: &str) -> TopologyResult<T>
where
    T: FromStr<Err = TopologyError>,
{
    raw.parse().map_err(|e: TopologyError| {
        StorageError::CorruptRow {
            table: table.to_string(),
            reason: format!("{column}: {e}"),
        }
        .into()
    })
}

fn parse_tenant(table: &str, raw: String) -> TopologyResult<TenantShardKey> {
    TenantShardKey::new(raw).map_err(|e| {
        StorageError::CorruptRow {
            table: table.to_string(),
            reason: format!("tenant: {e}"),
        }
        .into()
    })
}

// ── proxies ──

pub(crate) const PROXY_COLUMNS: &str = "id, tenant, entity_type, external_id, role, created_at";

pub(crate) struct RawProxy {
    id: String,
    tenant: String,
    entity_type: String,
    external_id: String,
    role: String,
    created_at: i64,
}

impl RawProxy {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            tenant: row.get(1)?,
            entity_type: row.get(2)?,
            external_id: row.get(3)?,
            role: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    pub(crate) fn decode(self) -> TopologyResult<ProxyVertex> {
        Ok(ProxyVertex {
            id: self.id,
            tenant: parse_tenant("proxies", self.tenant)?,
            entity_type: parse_column("proxies", "entity_type", &self.entity_type)?,
            external_id: self.external_id,
            role: parse_column("proxies", "role", &self.role)?,
            created_at: self.created_at,
        })
    }
}

// ── versions ──

pub(crate) const VERSION_COLUMNS: &str =
    "id, tenant, proxy_id, entity_type, external_id, payload, created, expired, close_reason";

pub(crate) struct RawVersion {
    id: String,
    tenant: String,
    proxy_id: String,
    entity_type: String,
    external_id: String,
    payload: String,
    created: i64,
    expired: i64,
    close_reason: Option<String>,
}

impl RawVersion {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            tenant: row.get(1)?,
            proxy_id: row.get(2)?,
            entity_type: row.get(3)?,
            external_id: row.get(4)?,
            payload: row.get(5)?,
            created: row.get(6)?,
            expired: row.get(7)?,
            close_reason: row.get(8)?,
        })
    }

    pub(crate) fn decode(self) -> TopologyResult<VersionedEntity> {
        let close_reason = match self.close_reason.as_deref() {
            Some(raw) => Some(parse_column("versions", "close_reason", raw)?),
            None => None,
        };
        Ok(VersionedEntity {
            id: self.id,
            tenant: parse_tenant("versions", self.tenant)?,
            proxy_id: self.proxy_id,
            entity_type: parse_column("versions", "entity_type", &self.entity_type)?,
            external_id: self.external_id,
            record: TemporalRecord {
                created: self.created,
                expired: self.expired,
                payload: serde_json::from_str(&self.payload)?,
            },
            close_reason,
        })
    }
}

// ── domain edges ──

pub(crate) const DOMAIN_EDGE_COLUMNS: &str =
    "id, tenant, kind, from_proxy, to_proxy, attributes, created_at";

pub(crate) struct RawDomainEdge {
    id: String,
    tenant: String,
    kind: String,
    from_proxy: String,
    to_proxy: String,
    attributes: String,
    created_at: i64,
}

impl RawDomainEdge {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            tenant: row.get(1)?,
            kind: row.get(2)?,
            from_proxy: row.get(3)?,
            to_proxy: row.get(4)?,
            attributes: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    pub(crate) fn decode(self) -> TopologyResult<DomainEdge> {
        Ok(DomainEdge {
            id: self.id,
            tenant: parse_tenant("domain_edges", self.tenant)?,
            kind: parse_column("domain_edges", "kind", &self.kind)?,
            from_proxy: self.from_proxy,
            to_proxy: self.to_proxy,
            attributes: serde_json::from_str(&self.attributes)?,
            created_at: self.created_at,
        })
    }
}

// ── bridging edges ──

pub(crate) const BRIDGING_EDGE_COLUMNS: &str =
    "bridge_key, tenant, connection_type, from_proxy, to_proxy, attributes, created_at";

pub(crate) struct RawBridgingEdge {
    bridge_key: String,
    tenant: String,
    connection_type: String,
    from_proxy: String,
    to_proxy: String,
    attributes: String,
    created_at: i64,
}

impl RawBridgingEdge {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            bridge_key: row.get(0)?,
            tenant: row.get(1)?,
            connection_type: row.get(2)?,
            from_proxy: row.get(3)?,
            to_proxy: row.get(4)?,
            attributes: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    pub(crate) fn decode(self) -> TopologyResult<BridgingEdge> {
        Ok(BridgingEdge {
            bridge_key: self.bridge_key,
            tenant: parse_tenant("bridging_edges", self.tenant)?,
            connection_type: parse_column(
                "bridging_edges",
                "connection_type",
                &self.connection_type,
            )?,
            from_proxy: self.from_proxy,
            to_proxy: self.to_proxy,
            attributes: serde_json::from_str(&self.attributes)?,
            created_at: self.created_at,
        })
    }
}

/// Collect a `query_map` over raw rows and decode each one.
pub(crate) fn decode_all<R, T, I>(rows: I, decode: fn(R) -> TopologyResult<T>) -> TopologyResult<Vec<T>>
where
    I: Iterator<Item = rusqlite::Result<R>>,
{
    rows.map(|raw| raw.map_err(to_storage_err).and_then(decode))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_tx_rolls_back_on_error() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (x INTEGER)").unwrap();

        let result: TopologyResult<()> = with_immediate_tx(&conn, |c| {
            c.execute("INSERT INTO t VALUES (1)", []).map_err(to_storage_err)?;
            Err(TopologyError::InvalidInput("abort".into()))
        });
        assert!(result.is_err());

        let n: i64 = conn.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0)).unwrap();
        assert_eq!(n, 0);
        assert!(conn.is_autocommit());
    }

    #[test]
    fn corrupt_enum_column_is_reported() {
        let err = parse_column::<topograph_core::EntityType>("versions", "entity_type", "printer")
            .unwrap_err();
        assert!(matches!(
            err,
            TopologyError::Storage(StorageError::CorruptRow { .. })
        ));
    }
}
