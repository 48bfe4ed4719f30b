/// Storage subsystem errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sqlite error: {message}")]
    SqliteError { message: String },

    /// Lock contention (SQLITE_BUSY / SQLITE_LOCKED). Transient.
    #[error("database busy: {message}")]
    Busy { message: String },

    #[error("migration v{version:03} failed: {reason}")]
    MigrationFailed { version: u32, reason: String },

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("corrupt row in {table}: {reason}")]
    CorruptRow { table: String, reason: String },
}
