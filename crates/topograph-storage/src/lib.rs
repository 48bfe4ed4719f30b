//! # topograph-storage
//!
//! SQLite persistence for the topology engine.
//! Implements `ITopologyStore` over a single write connection plus a read
//! pool (WAL mode). Every mutation that must be atomic runs inside one
//! `BEGIN IMMEDIATE` transaction on the writer.

pub mod engine;
pub mod migrations;
pub mod pool;
pub mod pragmas;
pub mod queries;

pub use engine::SqliteTopologyStore;
pub use pool::ConnectionPool;

use rusqlite::ErrorCode;
use topograph_core::errors::StorageError;
use topograph_core::TopologyError;

/// Convert a rusqlite error into a `TopologyError::Storage`.
///
/// Lock contention maps to `StorageError::Busy` so callers can retry.
pub fn to_storage_err(e: rusqlite::Error) -> TopologyError {
    let storage = match e.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => StorageError::Busy {
            message: e.to_string(),
        },
        _ => StorageError::SqliteError {
            message: e.to_string(),
        },
    };
    TopologyError::Storage(storage)
}

/// True for UNIQUE / PRIMARY KEY / CHECK violations.
pub(crate) fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(e.sqlite_error_code(), Some(ErrorCode::ConstraintViolation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_maps_to_retryable_storage_error() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            Some("database is locked".into()),
        );
        assert!(matches!(
            to_storage_err(err),
            TopologyError::Storage(StorageError::Busy { .. })
        ));
    }

    #[test]
    fn other_errors_map_to_sqlite_error() {
        let err = to_storage_err(rusqlite::Error::QueryReturnedNoRows);
        assert!(matches!(
            err,
            TopologyError::Storage(StorageError::SqliteError { .. })
        ));
    }
}
