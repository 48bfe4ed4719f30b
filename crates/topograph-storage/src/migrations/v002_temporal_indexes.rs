//! v002: range indexes for time-travel reads and the TTL candidate scan.

use rusqlite::Connection;

use topograph_core::TopologyResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> TopologyResult<()> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_versions_tenant_proxy_created
            ON versions(tenant, proxy_id, created);

        CREATE INDEX IF NOT EXISTS idx_versions_tenant_interval
            ON versions(tenant, created, expired);

        CREATE INDEX IF NOT EXISTS idx_versions_live_by_type
            ON versions(entity_type, created) WHERE expired = 9223372036854775807;

        CREATE INDEX IF NOT EXISTS idx_version_edges_from
            ON version_edges(from_id);
        ",
    )
    .map_err(to_storage_err)
}
