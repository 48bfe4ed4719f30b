//! Keyset-paginated range reads backing the lazy time-travel scans.

use rusqlite::{params, Connection};

use topograph_core::models::{EntityType, TenantShardKey, VersionedEntity};
use topograph_core::TopologyResult;

use super::{decode_all, RawVersion, VERSION_COLUMNS};
use crate::to_storage_err;

/// Versions valid at `at` (`created <= at < expired`), one per proxy,
/// ordered by `proxy_id` and starting strictly after `after_proxy`.
pub fn versions_valid_at_page(
    conn: &Connection,
    tenant: &TenantShardKey,
    entity_type: Option<EntityType>,
    at: i64,
    after_proxy: Option<&str>,
    limit: usize,
) -> TopologyResult<Vec<VersionedEntity>> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {VERSION_COLUMNS} FROM versions
             WHERE tenant = ?1
               AND created <= ?2 AND expired > ?2
               AND (?3 IS NULL OR entity_type = ?3)
               AND (?4 IS NULL OR proxy_id > ?4)
             ORDER BY proxy_id
             LIMIT ?5"
        ))
        .map_err(to_storage_err)?;
    let rows = stmt
        .query_map(
            params![
                tenant.as_str(),
                at,
                entity_type.map(|t| t.as_str()),
                after_proxy,
                limit as i64,
            ],
            RawVersion::from_row,
        )
        .map_err(to_storage_err)?;
    decode_all(rows, RawVersion::decode)
}

/// A proxy's versions overlapping `[from, to)`, ordered by `created` and
/// starting strictly after `after_created`.
pub fn versions_overlapping_page(
    conn: &Connection,
    tenant: &TenantShardKey,
    proxy_id: &str,
    from: i64,
    to: i64,
    after_created: Option<i64>,
    limit: usize,
) -> TopologyResult<Vec<VersionedEntity>> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {VERSION_COLUMNS} FROM versions
             WHERE tenant = ?1 AND proxy_id = ?2
               AND created < ?4 AND expired > ?3
               AND (?5 IS NULL OR created > ?5)
             ORDER BY created
             LIMIT ?6"
        ))
        .map_err(to_storage_err)?;
    let rows = stmt
        .query_map(
            params![tenant.as_str(), proxy_id, from, to, after_created, limit as i64],
            RawVersion::from_row,
        )
        .map_err(to_storage_err)?;
    decode_all(rows, RawVersion::decode)
}
