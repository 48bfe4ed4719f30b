//! Version chain writes and point reads.
//!
//! The only UPDATE ever issued against `versions` is a conditional close:
//! `expired` moves from `MAX_TIMESTAMP` to a finite value exactly once.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use topograph_core::models::{
    CloseReason, EntityType, TenantShardKey, VersionEdge, VersionEdgeDirection, VersionedEntity,
    MAX_TIMESTAMP,
};
use topograph_core::traits::VersionAppend;
use topograph_core::{TopologyError, TopologyResult};

use super::{decode_all, with_immediate_tx, RawVersion, VERSION_COLUMNS};
use crate::{is_constraint_violation, to_storage_err};

pub fn latest_version(
    conn: &Connection,
    tenant: &TenantShardKey,
    proxy_id: &str,
) -> TopologyResult<Option<VersionedEntity>> {
    conn.query_row(
        &format!(
            "SELECT {VERSION_COLUMNS} FROM versions
             WHERE tenant = ?1 AND proxy_id = ?2
             ORDER BY created DESC LIMIT 1"
        ),
        params![tenant.as_str(), proxy_id],
        RawVersion::from_row,
    )
    .optional()
    .map_err(to_storage_err)?
    .map(RawVersion::decode)
    .transpose()
}

/// Compare-and-close-then-append in one immediate transaction.
pub fn append_version(conn: &Connection, append: &VersionAppend) -> TopologyResult<()> {
    let version = &append.version;
    version.record.validate()?;
    let as_of = version.created();

    with_immediate_tx(conn, |tx| {
        match &append.close_live {
            Some(live_id) => {
                let closed = tx
                    .execute(
                        "UPDATE versions SET expired = ?1, close_reason = ?2
                         WHERE id = ?3 AND tenant = ?4 AND expired = ?5 AND created < ?1",
                        params![
                            as_of,
                            CloseReason::Superseded.as_str(),
                            live_id,
                            version.tenant.as_str(),
                            MAX_TIMESTAMP,
                        ],
                    )
                    .map_err(to_storage_err)?;
                if closed == 0 {
                    return Err(TopologyError::ConcurrentModification {
                        proxy_id: version.proxy_id.clone(),
                        reason: format!("version {live_id} is no longer live"),
                    });
                }
            }
            None => {
                // Nothing observed live: nothing may reach past the new start either.
                let reaching: bool = tx
                    .prepare("SELECT 1 FROM versions WHERE proxy_id = ?1 AND expired > ?2")
                    .and_then(|mut s| s.exists(params![version.proxy_id, as_of]))
                    .map_err(to_storage_err)?;
                if reaching {
                    return Err(TopologyError::ConcurrentModification {
                        proxy_id: version.proxy_id.clone(),
                        reason: "chain changed since it was read".to_string(),
                    });
                }
            }
        }

        insert_version_row(tx, version)?;
        insert_version_edges(tx, append)?;
        Ok(())
    })?;

    debug!(
        proxy_id = %version.proxy_id,
        version_id = %version.id,
        created = as_of,
        closed = ?append.close_live,
        "appended version"
    );
    Ok(())
}

fn insert_version_row(conn: &Connection, version: &VersionedEntity) -> TopologyResult<()> {
    let payload = serde_json::to_string(version.payload())?;
    conn.execute(
        "INSERT INTO versions (id, tenant, proxy_id, entity_type, external_id, payload, created, expired, close_reason)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            version.id,
            version.tenant.as_str(),
            version.proxy_id,
            version.entity_type.as_str(),
            version.external_id,
            payload,
            version.created(),
            version.expired(),
            version.close_reason.map(|r| r.as_str()),
        ],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            TopologyError::ConcurrentModification {
                proxy_id: version.proxy_id.clone(),
                reason: format!("version insert rejected: {e}"),
            }
        } else {
            to_storage_err(e)
        }
    })?;
    Ok(())
}

fn insert_version_edges(conn: &Connection, append: &VersionAppend) -> TopologyResult<()> {
    let version = &append.version;
    let edges = [
        (
            version.proxy_id.as_str(),
            version.id.as_str(),
            VersionEdgeDirection::ProxyToVersion,
        ),
        (
            version.id.as_str(),
            append.proxy_out_id.as_str(),
            VersionEdgeDirection::VersionToProxy,
        ),
    ];
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO version_edges (tenant, from_id, to_id, version_id, direction, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .map_err(to_storage_err)?;
    for (from_id, to_id, direction) in edges {
        stmt.execute(params![
            version.tenant.as_str(),
            from_id,
            to_id,
            version.id,
            direction.as_str(),
            append.recorded_at,
        ])
        .map_err(to_storage_err)?;
    }
    Ok(())
}

/// TTL close. Re-checks liveness and age in the WHERE clause.
pub fn close_if_due(
    conn: &Connection,
    tenant: &TenantShardKey,
    version_id: &str,
    now: i64,
    cutoff: i64,
) -> TopologyResult<bool> {
    let changed = conn
        .execute(
            "UPDATE versions SET expired = ?1, close_reason = ?2
             WHERE id = ?3 AND tenant = ?4 AND expired = ?5 AND created <= ?6 AND created < ?1",
            params![
                now,
                CloseReason::Expired.as_str(),
                version_id,
                tenant.as_str(),
                MAX_TIMESTAMP,
                cutoff,
            ],
        )
        .map_err(to_storage_err)?;
    Ok(changed == 1)
}

pub fn version_at(
    conn: &Connection,
    tenant: &TenantShardKey,
    proxy_id: &str,
    t: i64,
) -> TopologyResult<Option<VersionedEntity>> {
    conn.query_row(
        &format!(
            "SELECT {VERSION_COLUMNS} FROM versions
             WHERE tenant = ?1 AND proxy_id = ?2 AND created <= ?3 AND expired > ?3
             ORDER BY created DESC LIMIT 1"
        ),
        params![tenant.as_str(), proxy_id, t],
        RawVersion::from_row,
    )
    .optional()
    .map_err(to_storage_err)?
    .map(RawVersion::decode)
    .transpose()
}

pub fn versions_for_proxy(
    conn: &Connection,
    tenant: &TenantShardKey,
    proxy_id: &str,
) -> TopologyResult<Vec<VersionedEntity>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {VERSION_COLUMNS} FROM versions
             WHERE tenant = ?1 AND proxy_id = ?2 ORDER BY created"
        ))
        .map_err(to_storage_err)?;
    let rows = stmt
        .query_map(params![tenant.as_str(), proxy_id], RawVersion::from_row)
        .map_err(to_storage_err)?;
    decode_all(rows, RawVersion::decode)
}

pub fn versions_for_tenant(
    conn: &Connection,
    tenant: &TenantShardKey,
) -> TopologyResult<Vec<VersionedEntity>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {VERSION_COLUMNS} FROM versions
             WHERE tenant = ?1 ORDER BY proxy_id, created"
        ))
        .map_err(to_storage_err)?;
    let rows = stmt
        .query_map(params![tenant.as_str()], RawVersion::from_row)
        .map_err(to_storage_err)?;
    decode_all(rows, RawVersion::decode)
}

/// TTL candidates across all tenants, oldest first.
pub fn live_versions_due(
    conn: &Connection,
    entity_type: EntityType,
    cutoff: i64,
) -> TopologyResult<Vec<VersionedEntity>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {VERSION_COLUMNS} FROM versions
             WHERE entity_type = ?1 AND expired = ?2 AND created <= ?3
             ORDER BY created, proxy_id"
        ))
        .map_err(to_storage_err)?;
    let rows = stmt
        .query_map(
            params![entity_type.as_str(), MAX_TIMESTAMP, cutoff],
            RawVersion::from_row,
        )
        .map_err(to_storage_err)?;
    decode_all(rows, RawVersion::decode)
}

pub fn version_edges(conn: &Connection, version_id: &str) -> TopologyResult<Vec<VersionEdge>> {
    let mut stmt = conn
        .prepare(
            "SELECT tenant, from_id, to_id, version_id, direction, created_at
             FROM version_edges WHERE version_id = ?1 ORDER BY direction",
        )
        .map_err(to_storage_err)?;
    let rows = stmt
        .query_map(params![version_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })
        .map_err(to_storage_err)?;

    let mut edges = Vec::new();
    for row in rows {
        let (tenant, from_id, to_id, version_id, direction, created_at) =
            row.map_err(to_storage_err)?;
        edges.push(VersionEdge {
            tenant: TenantShardKey::new(tenant)?,
            from_id,
            to_id,
            version_id,
            direction: direction.parse()?,
            created_at,
        });
    }
    Ok(edges)
}
