//! Domain edge persistence. One table for all three kinds; the id is derived
//! from `(kind, from_proxy, to_proxy)`.

use rusqlite::{params, Connection};

use topograph_core::models::{DomainEdge, TenantShardKey};
use topograph_core::TopologyResult;

use super::{decode_all, RawDomainEdge, DOMAIN_EDGE_COLUMNS};
use crate::to_storage_err;

/// Insert, or refresh the attributes of an existing edge. The original
/// `created_at` is kept.
pub fn upsert_domain_edge(conn: &Connection, edge: &DomainEdge) -> TopologyResult<DomainEdge> {
    let attributes = serde_json::to_string(&edge.attributes)?;
    conn.query_row(
        &format!(
            "INSERT INTO domain_edges (id, tenant, kind, from_proxy, to_proxy, attributes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (id) DO UPDATE SET attributes = excluded.attributes
             RETURNING {DOMAIN_EDGE_COLUMNS}"
        ),
        params![
            edge.id,
            edge.tenant.as_str(),
            edge.kind.as_str(),
            edge.from_proxy,
            edge.to_proxy,
            attributes,
            edge.created_at,
        ],
        RawDomainEdge::from_row,
    )
    .map_err(to_storage_err)?
    .decode()
}

pub fn list_domain_edges(
    conn: &Connection,
    tenant: &TenantShardKey,
) -> TopologyResult<Vec<DomainEdge>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {DOMAIN_EDGE_COLUMNS} FROM domain_edges
             WHERE tenant = ?1 ORDER BY kind, from_proxy, to_proxy"
        ))
        .map_err(to_storage_err)?;
    let rows = stmt
        .query_map(params![tenant.as_str()], RawDomainEdge::from_row)
        .map_err(to_storage_err)?;
    decode_all(rows, RawDomainEdge::decode)
}

/// Edges stored under another tenant that end at one of `tenant`'s proxies.
/// Only shared-reference proxies can be the target of such an edge.
pub fn list_inbound_domain_edges(
    conn: &Connection,
    tenant: &TenantShardKey,
) -> TopologyResult<Vec<DomainEdge>> {
    let mut stmt = conn
        .prepare(
            "SELECT d.id, d.tenant, d.kind, d.from_proxy, d.to_proxy, d.attributes, d.created_at
             FROM domain_edges d JOIN proxies p ON p.id = d.to_proxy
             WHERE p.tenant = ?1 AND d.tenant <> ?1
             ORDER BY d.kind, d.from_proxy, d.to_proxy",
        )
        .map_err(to_storage_err)?;
    let rows = stmt
        .query_map(params![tenant.as_str()], RawDomainEdge::from_row)
        .map_err(to_storage_err)?;
    decode_all(rows, RawDomainEdge::decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;
    use crate::queries::proxy_ops::insert_proxy;
    use topograph_core::models::{DomainEdgeKind, EntityType, ProxyRole, ProxyVertex};

    #[test]
    fn relinking_refreshes_attributes_only() {
        let conn = Connection::open_in_memory().unwrap();
        crate::pragmas::configure_connection(&conn).unwrap();
        run_migrations(&conn).unwrap();
        let acme = TenantShardKey::new("acme").unwrap();
        let from = ProxyVertex::new(acme.clone(), EntityType::Device, "1", ProxyRole::Out, 0);
        let to = ProxyVertex::new(acme.clone(), EntityType::Software, "ssh", ProxyRole::In, 0);
        insert_proxy(&conn, &from).unwrap();
        insert_proxy(&conn, &to).unwrap();

        let kind = DomainEdgeKind::HasDeviceSoftware;
        let mut edge = DomainEdge {
            id: DomainEdge::make_id(kind, &from.id, &to.id),
            tenant: acme.clone(),
            kind,
            from_proxy: from.id.clone(),
            to_proxy: to.id.clone(),
            attributes: serde_json::json!({ "port": 22 }),
            created_at: 10,
        };
        upsert_domain_edge(&conn, &edge).unwrap();

        edge.attributes = serde_json::json!({ "port": 2222 });
        edge.created_at = 20;
        let stored = upsert_domain_edge(&conn, &edge).unwrap();
        assert_eq!(stored.created_at, 10);
        assert_eq!(stored.attributes["port"], 2222);
        assert_eq!(list_domain_edges(&conn, &acme).unwrap().len(), 1);
    }
}
