//! SQLite PRAGMA configuration.
//! Must be called on every connection immediately after opening.

use rusqlite::Connection;

use topograph_core::TopologyResult;

use crate::to_storage_err;

/// Writer connection setup: WAL, busy_timeout as the contention mechanism,
/// foreign keys enforced so edges can never point at missing proxies.
pub fn configure_connection(conn: &Connection) -> TopologyResult<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
        PRAGMA cache_size = -8000;
        PRAGMA temp_store = MEMORY;
        ",
    )
    .map_err(to_storage_err)
}

/// Reader connection setup. Adds `query_only` so the read pool cannot write.
pub fn configure_readonly_connection(conn: &Connection) -> TopologyResult<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
        PRAGMA cache_size = -8000;
        PRAGMA temp_store = MEMORY;
        PRAGMA query_only = ON;
        ",
    )
    .map_err(to_storage_err)
}
