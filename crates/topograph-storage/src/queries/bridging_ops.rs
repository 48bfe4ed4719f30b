//! Bridging edge persistence. Bridges are keyed by a deterministic
//! `bridge_key`, so replaying an enforcement pass inserts nothing new.

use rusqlite::{params, Connection};

use topograph_core::models::{BridgingEdge, TenantShardKey};
use topograph_core::TopologyResult;

use super::{decode_all, with_immediate_tx, RawBridgingEdge, BRIDGING_EDGE_COLUMNS};
use crate::to_storage_err;

/// Batch insert-or-ignore in one transaction. Returns the number of new rows.
pub fn insert_bridging_edges(conn: &Connection, edges: &[BridgingEdge]) -> TopologyResult<usize> {
    if edges.is_empty() {
        return Ok(0);
    }
    with_immediate_tx(conn, |tx| {
        let mut stmt = tx
            .prepare_cached(
                "INSERT OR IGNORE INTO bridging_edges
                 (bridge_key, tenant, connection_type, from_proxy, to_proxy, attributes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .map_err(to_storage_err)?;
        let mut inserted = 0;
        for edge in edges {
            inserted += stmt
                .execute(params![
                    edge.bridge_key,
                    edge.tenant.as_str(),
                    edge.connection_type.as_string(),
                    edge.from_proxy,
                    edge.to_proxy,
                    serde_json::to_string(&edge.attributes)?,
                    edge.created_at,
                ])
                .map_err(to_storage_err)?;
        }
        Ok(inserted)
    })
}

pub fn list_bridging_edges(
    conn: &Connection,
    tenant: &TenantShardKey,
) -> TopologyResult<Vec<BridgingEdge>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {BRIDGING_EDGE_COLUMNS} FROM bridging_edges
             WHERE tenant = ?1 ORDER BY connection_type, from_proxy, to_proxy"
        ))
        .map_err(to_storage_err)?;
    let rows = stmt
        .query_map(params![tenant.as_str()], RawBridgingEdge::from_row)
        .map_err(to_storage_err)?;
    decode_all(rows, RawBridgingEdge::decode)
}

/// Delete the listed bridges of one tenant in one transaction. Keys owned
/// by another tenant are left alone.
pub fn delete_bridging_edges_by_key(
    conn: &Connection,
    tenant: &TenantShardKey,
    keys: &[String],
) -> TopologyResult<usize> {
    if keys.is_empty() {
        return Ok(0);
    }
    with_immediate_tx(conn, |tx| {
        let mut stmt = tx
            .prepare_cached("DELETE FROM bridging_edges WHERE tenant = ?1 AND bridge_key = ?2")
            .map_err(to_storage_err)?;
        let mut removed = 0;
        for key in keys {
            removed += stmt
                .execute(params![tenant.as_str(), key])
                .map_err(to_storage_err)?;
        }
        Ok(removed)
    })
}

pub fn delete_bridging_edges(conn: &Connection, tenant: &TenantShardKey) -> TopologyResult<usize> {
    conn.execute(
        "DELETE FROM bridging_edges WHERE tenant = ?1",
        params![tenant.as_str()],
    )
    .map_err(to_storage_err)
}
