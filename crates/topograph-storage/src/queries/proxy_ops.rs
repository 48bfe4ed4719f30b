//! Proxy vertex insert and lookup. Proxies are never updated or deleted.

use rusqlite::{params, Connection, OptionalExtension};

use topograph_core::models::{ProxyVertex, TenantShardKey};
use topograph_core::TopologyResult;

use super::{decode_all, RawProxy, PROXY_COLUMNS};
use crate::to_storage_err;

/// `INSERT OR IGNORE`. Returns `true` when this call wrote the row.
pub fn insert_proxy(conn: &Connection, proxy: &ProxyVertex) -> TopologyResult<bool> {
    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO proxies (id, tenant, entity_type, external_id, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                proxy.id,
                proxy.tenant.as_str(),
                proxy.entity_type.as_str(),
                proxy.external_id,
                proxy.role.as_str(),
                proxy.created_at,
            ],
        )
        .map_err(to_storage_err)?;
    Ok(inserted == 1)
}

pub fn get_proxy(conn: &Connection, id: &str) -> TopologyResult<Option<ProxyVertex>> {
    conn.query_row(
        &format!("SELECT {PROXY_COLUMNS} FROM proxies WHERE id = ?1"),
        params![id],
        RawProxy::from_row,
    )
    .optional()
    .map_err(to_storage_err)?
    .map(RawProxy::decode)
    .transpose()
}

/// Ordered by `(external_id, id)`: the deterministic order the enforcer indexes by.
pub fn list_proxies(conn: &Connection, tenant: &TenantShardKey) -> TopologyResult<Vec<ProxyVertex>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {PROXY_COLUMNS} FROM proxies WHERE tenant = ?1 ORDER BY external_id, id"
        ))
        .map_err(to_storage_err)?;
    let rows = stmt
        .query_map(params![tenant.as_str()], RawProxy::from_row)
        .map_err(to_storage_err)?;
    decode_all(rows, RawProxy::decode)
}

pub fn list_tenants(conn: &Connection) -> TopologyResult<Vec<TenantShardKey>> {
    let mut stmt = conn
        .prepare("SELECT DISTINCT tenant FROM proxies ORDER BY tenant")
        .map_err(to_storage_err)?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(to_storage_err)?;
    rows.map(|r| r.map_err(to_storage_err).and_then(TenantShardKey::new))
        .collect()
}
