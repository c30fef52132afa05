//! Error types for tern-core

use thiserror::Error;

/// Core error type for tern
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Failed to parse configuration file
    #[error("[E002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// E003: Invalid configuration value
    #[error("[E003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E004: Unit directory not found
    #[error("[E004] Unit directory not found: {path}")]
    UnitDirectoryNotFound { path: String },

    /// E005: Two files in one directory resolve to the same identifier
    #[error("[E005] Duplicate unit '{name}': {path1} and {path2}")]
    DuplicateUnit {
        name: String,
        path1: String,
        path2: String,
    },

    /// E006: Invalid unit identifier
    #[error("[E006] Invalid unit name '{name}': {reason}")]
    InvalidUnitName { name: String, reason: String },

    /// E007: Cyclic invoke declarations between units
    #[error("[E007] Cyclic invoke detected: {cycle}")]
    CyclicInvoke { cycle: String },

    /// E008: Snapshot file missing from the backup directory
    #[error("[E008] Backup not found: {path}")]
    BackupMissing { path: String },

    /// E009: Snapshot or ledger could not be written
    #[error("[E009] Failed to write '{path}': {source}")]
    BackupWriteFailure {
        path: String,
        source: std::io::Error,
    },

    /// E010: Another invocation holds the ledger guard file
    #[error("[E010] Ledger is held by {holder} (delete '{path}' once it has exited)")]
    LedgerBusy { path: String, holder: String },

    /// E011: Ledger operation referenced an identifier without history
    #[error("[E011] No ledger entry for '{name}'")]
    NoLedgerEntry { name: String },

    /// E014: IO error
    #[error("[E014] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// E016: IO error with file path context
    #[error("[E016] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// E015: YAML parse error
    #[error("[E015] YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
