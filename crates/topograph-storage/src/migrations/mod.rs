//! Migration runner: version tracking, forward-only, transactional per migration.

mod v001_topology_tables;
mod v002_temporal_indexes;

use rusqlite::Connection;
use tracing::{debug, info, warn};

use topograph_core::errors::StorageError;
use topograph_core::TopologyResult;

use crate::to_storage_err;

pub const LATEST_VERSION: u32 = 2;

type MigrationFn = fn(&Connection) -> TopologyResult<()>;

const MIGRATIONS: [(u32, &str, MigrationFn); 2] = [
    (1, "topology_tables", v001_topology_tables::migrate),
    (2, "temporal_indexes", v002_temporal_indexes::migrate),
];

/// Current schema version; 0 when the version table does not exist yet.
pub fn current_version(conn: &Connection) -> TopologyResult<u32> {
    let exists: bool = conn
        .prepare(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='topology_schema_version'",
        )
        .and_then(|mut stmt| stmt.exists([]))
        .map_err(to_storage_err)?;

    if !exists {
        return Ok(0);
    }

    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM topology_schema_version",
        [],
        |row| row.get(0),
    )
    .map_err(to_storage_err)
}

/// Run all pending migrations. Returns how many were applied.
pub fn run_migrations(conn: &Connection) -> TopologyResult<u32> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS topology_schema_version (
            version    INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL DEFAULT (unixepoch())
        ) STRICT;",
    )
    .map_err(to_storage_err)?;

    let current = current_version(conn)?;
    if current >= LATEST_VERSION {
        debug!("topology schema is up to date (v{current})");
        return Ok(0);
    }

    info!(from = current, to = LATEST_VERSION, "running topology migrations");

    let mut applied = 0;
    for &(version, name, migrate_fn) in &MIGRATIONS {
        if version <= current {
            continue;
        }

        debug!("applying migration v{version:03}: {name}");
        conn.execute_batch("BEGIN IMMEDIATE").map_err(to_storage_err)?;

        let outcome = migrate_fn(conn).and_then(|()| {
            conn.execute(
                "INSERT INTO topology_schema_version (version) VALUES (?1)",
                [version],
            )
            .map_err(to_storage_err)?;
            conn.execute_batch("COMMIT").map_err(to_storage_err)
        });

        if let Err(e) = outcome {
            warn!("migration v{version:03} failed: {e}, rolling back");
            let _ = conn.execute_batch("ROLLBACK");
            return Err(StorageError::MigrationFailed {
                version,
                reason: e.to_string(),
            }
            .into());
        }

        info!("applied migration v{version:03}: {name}");
        applied += 1;
    }

    Ok(applied)
}
