//! Error taxonomy of the execution engine
//!
//! Every variant carries a stable code and a process exit status so that
//! automation can branch on the failure class.

use crate::unit::UnitError;
use tern_core::{CoreError, UnitKind};
use tern_db::DbError;
use thiserror::Error;

/// Engine error type
#[derive(Error, Debug)]
pub enum EngineError {
    /// T001: Identifier does not resolve to a unit file
    #[error("[T001] Unit not found: {name}")]
    UnitNotFound { name: String },

    /// T002: Unit file has no constructor or does not honor the contract
    #[error("[T002] '{name}' is not a valid {kind} unit: {reason}")]
    InvalidBaseType {
        name: String,
        kind: UnitKind,
        reason: String,
    },

    /// T003: Rollback requested for a unit without ledger entry
    #[error("[T003] No lock entry for '{name}'")]
    NoLockFound { name: String },

    /// T004: Ledger entry has no recorded versions
    #[error("[T004] Lock entry for '{name}' has no recorded versions")]
    NoMetadata { name: String },

    /// T005: Rollback target is the current version
    #[error("[T005] Cannot roll '{name}' back to version {version}: it is the current version")]
    InvalidTarget { name: String, version: u32 },

    /// T006: Rollback target is not in the ledger
    #[error("[T006] Version {version} of '{name}' is not in the lock history")]
    UnknownVersion { name: String, version: u32 },

    /// T007: Snapshot missing at restore time
    #[error("[T007] Backup not found: {path}")]
    BackupMissing { path: String },

    /// T008: Ledger or snapshot could not be written
    #[error("[T008] Failed to write '{path}': {source}")]
    BackupWriteFailure {
        path: String,
        source: std::io::Error,
    },

    /// T009: Commit or rollback failed
    #[error("[T009] Transaction failed for '{name}': {source}")]
    TransactionFailure { name: String, source: DbError },

    /// T010: The unit itself failed
    #[error("[T010] '{name}' failed during {phase}: {source}")]
    UnitExecution {
        name: String,
        phase: &'static str,
        source: UnitError,
    },

    /// T011: Units invoke each other cyclically
    #[error("[T011] Cyclic invoke detected: {cycle}")]
    CyclicInvoke { cycle: String },

    /// T012: Another invocation holds the ledger guard
    #[error("[T012] Ledger is held by {holder} (delete '{path}' once it has exited)")]
    LedgerBusy { path: String, holder: String },

    /// T013: A rollback finished without executing anything
    #[error("[T013] Rolling '{name}' back executed nothing: {reason}")]
    NothingExecuted { name: String, reason: String },

    /// Configuration, discovery or ledger error
    #[error(transparent)]
    Core(CoreError),

    /// Database error outside of a unit
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Result type alias for EngineError
pub type EngineResult<T> = Result<T, EngineError>;

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::BackupMissing { path } => EngineError::BackupMissing { path },
            CoreError::BackupWriteFailure { path, source } => {
                EngineError::BackupWriteFailure { path, source }
            }
            CoreError::CyclicInvoke { cycle } => EngineError::CyclicInvoke { cycle },
            CoreError::LedgerBusy { path, holder } => EngineError::LedgerBusy { path, holder },
            CoreError::NoLedgerEntry { name } => EngineError::NoLockFound { name },
            other => EngineError::Core(other),
        }
    }
}

impl EngineError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::UnitNotFound { .. } => "T001",
            EngineError::InvalidBaseType { .. } => "T002",
            EngineError::NoLockFound { .. } => "T003",
            EngineError::NoMetadata { .. } => "T004",
            EngineError::InvalidTarget { .. } => "T005",
            EngineError::UnknownVersion { .. } => "T006",
            EngineError::BackupMissing { .. } => "T007",
            EngineError::BackupWriteFailure { .. } => "T008",
            EngineError::TransactionFailure { .. } => "T009",
            EngineError::UnitExecution { .. } => "T010",
            EngineError::CyclicInvoke { .. } => "T011",
            EngineError::LedgerBusy { .. } => "T012",
            EngineError::NothingExecuted { .. } => "T013",
            EngineError::Core(_) => "E000",
            EngineError::Db(_) => "D000",
        }
    }

    /// Process exit status for this failure class
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::UnitNotFound { .. } => 10,
            EngineError::InvalidBaseType { .. } => 11,
            EngineError::NoLockFound { .. } => 12,
            EngineError::NoMetadata { .. } => 13,
            EngineError::InvalidTarget { .. } => 14,
            EngineError::UnknownVersion { .. } => 15,
            EngineError::BackupMissing { .. } => 16,
            EngineError::BackupWriteFailure { .. } => 17,
            EngineError::TransactionFailure { .. } => 18,
            EngineError::UnitExecution { .. } => 19,
            EngineError::CyclicInvoke { .. } => 20,
            EngineError::LedgerBusy { .. } => 21,
            EngineError::NothingExecuted { .. } => 22,
            EngineError::Core(_) | EngineError::Db(_) => 1,
        }
    }
}
