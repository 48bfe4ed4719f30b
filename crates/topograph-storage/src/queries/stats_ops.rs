//! Row counts and health probes.

use rusqlite::{params, Connection};

use topograph_core::models::{StoreStats, MAX_TIMESTAMP};
use topograph_core::TopologyResult;

use crate::to_storage_err;

fn count(conn: &Connection, sql: &str) -> TopologyResult<u64> {
    conn.query_row(sql, [], |row| row.get::<_, i64>(0))
        .map(|n| n.max(0) as u64)
        .map_err(to_storage_err)
}

pub fn stats(conn: &Connection) -> TopologyResult<StoreStats> {
    let live_version_count = conn
        .query_row(
            "SELECT COUNT(*) FROM versions WHERE expired = ?1",
            params![MAX_TIMESTAMP],
            |row| row.get::<_, i64>(0),
        )
        .map_err(to_storage_err)?;

    Ok(StoreStats {
        proxy_count: count(conn, "SELECT COUNT(*) FROM proxies")?,
        version_count: count(conn, "SELECT COUNT(*) FROM versions")?,
        live_version_count: live_version_count.max(0) as u64,
        version_edge_count: count(conn, "SELECT COUNT(*) FROM version_edges")?,
        domain_edge_count: count(conn, "SELECT COUNT(*) FROM domain_edges")?,
        bridging_edge_count: count(conn, "SELECT COUNT(*) FROM bridging_edges")?,
    })
}

/// `SELECT 1` round trip.
pub fn ping(conn: &Connection) -> bool {
    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
        .map(|v| v == 1)
        .unwrap_or(false)
}
