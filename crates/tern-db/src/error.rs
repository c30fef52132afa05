//! Error types for tern-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// D001: The database file could not be opened
    #[error("[D001] Could not open database: {0}")]
    ConnectionError(String),

    /// D002: A statement was rejected by the database
    #[error("[D002] Statement failed: {0}")]
    ExecutionError(String),

    /// D003: A relation named by the engine does not exist
    #[error("[D003] Table or view not found: {0}")]
    TableNotFound(String),

    /// D004: A CSV seed could not be loaded
    #[error("[D004] CSV seed load failed: {0}")]
    CsvError(String),

    /// D005: BEGIN, COMMIT or ROLLBACK failed
    #[error("[D005] Transaction failed: {0}")]
    TransactionError(String),

    /// D006: A previous holder of the connection panicked
    #[error("[D006] Connection lock poisoned: {0}")]
    MutexPoisoned(String),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        // duckdb::Error does not expose structured variants, so the catalog
        // message is the only way to tell a missing relation apart.
        let msg = err.to_string();
        if msg.contains("Table with name")
            || msg.contains("View with name")
            || msg.contains("Table or view with name")
            || (msg.contains("Catalog Error") && msg.contains("Table") && msg.contains("not found"))
        {
            DbError::TableNotFound(msg)
        } else {
            DbError::ExecutionError(msg)
        }
    }
}
