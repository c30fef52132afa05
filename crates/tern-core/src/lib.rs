//! tern-core - Core library for tern
//!
//! This crate provides configuration parsing, unit discovery, the content
//! version guard, definition snapshots, the lock ledger and the invoke graph
//! shared by the migration and seed engines.

pub mod backup;
pub mod checksum;
pub mod config;
pub mod discovery;
pub mod error;
pub mod guard;
pub mod invoke_graph;
pub mod kind;
pub mod ledger;
pub mod lock;
pub mod unit_name;

pub use backup::{format_timestamp, timestamp_now, BackupStore};
pub use checksum::compute_file_checksum;
pub use config::{Config, DatabaseConfig, PacingConfig, UnitDirConfig};
pub use discovery::{discover_units, find_unit, qualify, UnitFile};
pub use error::{CoreError, CoreResult};
pub use guard::{guard_version, has_changed, GuardDecision};
pub use invoke_graph::InvokeGraph;
pub use kind::UnitKind;
pub use ledger::{Ledger, LedgerEntry, VersionRecord};
pub use lock::LedgerLock;
pub use unit_name::UnitName;
