//! v001: proxies, versions, hasVersion edges, domain edges, bridging edges.

use rusqlite::Connection;

use topograph_core::TopologyResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> TopologyResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS proxies (
            id          TEXT PRIMARY KEY,
            tenant      TEXT NOT NULL CHECK (length(tenant) > 0),
            entity_type TEXT NOT NULL CHECK (entity_type IN ('device', 'software', 'location')),
            external_id TEXT NOT NULL CHECK (length(external_id) > 0),
            role        TEXT NOT NULL CHECK (role IN ('in', 'out')),
            created_at  INTEGER NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_proxies_tenant_order
            ON proxies(tenant, external_id, id);

        CREATE TABLE IF NOT EXISTS versions (
            id           TEXT PRIMARY KEY,
            tenant       TEXT NOT NULL,
            proxy_id     TEXT NOT NULL REFERENCES proxies(id),
            entity_type  TEXT NOT NULL CHECK (entity_type IN ('device', 'software', 'location')),
            external_id  TEXT NOT NULL,
            payload      TEXT NOT NULL,
            created      INTEGER NOT NULL,
            expired      INTEGER NOT NULL,
            close_reason TEXT CHECK (close_reason IS NULL OR close_reason IN ('superseded', 'expired')),
            CHECK (created < expired),
            UNIQUE (proxy_id, created)
        ) STRICT;

        -- At most one live version per proxy.
        CREATE UNIQUE INDEX IF NOT EXISTS ux_versions_one_live
            ON versions(proxy_id) WHERE expired = 9223372036854775807;

        CREATE TABLE IF NOT EXISTS version_edges (
            tenant     TEXT NOT NULL,
            from_id    TEXT NOT NULL,
            to_id      TEXT NOT NULL,
            version_id TEXT NOT NULL REFERENCES versions(id),
            direction  TEXT NOT NULL CHECK (direction IN ('proxy_to_version', 'version_to_proxy')),
            created_at INTEGER NOT NULL,
            PRIMARY KEY (version_id, direction)
        ) STRICT;

        CREATE TABLE IF NOT EXISTS domain_edges (
            id         TEXT PRIMARY KEY,
            tenant     TEXT NOT NULL,
            kind       TEXT NOT NULL CHECK (kind IN ('hasConnection', 'hasDeviceSoftware', 'hasLocation')),
            from_proxy TEXT NOT NULL REFERENCES proxies(id),
            to_proxy   TEXT NOT NULL REFERENCES proxies(id),
            attributes TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            UNIQUE (kind, from_proxy, to_proxy)
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_domain_edges_tenant
            ON domain_edges(tenant);

        CREATE TABLE IF NOT EXISTS bridging_edges (
            bridge_key      TEXT PRIMARY KEY,
            tenant          TEXT NOT NULL,
            connection_type TEXT NOT NULL CHECK (
                connection_type IN ('temporal_sequence', 'cross_domain_proxy', 'orphan_fallback')
                OR connection_type LIKE '%\\_proxy\\_network' ESCAPE '\\'
            ),
            from_proxy      TEXT NOT NULL REFERENCES proxies(id),
            to_proxy        TEXT NOT NULL REFERENCES proxies(id),
            attributes      TEXT NOT NULL,
            created_at      INTEGER NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_bridging_edges_tenant_type
            ON bridging_edges(tenant, connection_type);
        ",
    )
    .map_err(to_storage_err)
}
