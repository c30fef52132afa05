//! tern-engine - Migration and seed execution engine
//!
//! This crate runs discovered units against a [`tern_db::Database`]: it
//! applies, drops, alters and rolls back migrations, runs and rolls back
//! seeds, and keeps the lock ledger and definition snapshots in step with
//! what actually executed.

pub(crate) mod books;
pub mod context;
pub mod error;
pub(crate) mod executor;
pub mod migrate;
pub mod registry;
pub mod report;
pub mod rollback;
pub mod seed;
pub mod sql;
pub mod unit;

pub use books::EngineSettings;
pub use context::ExecutionContext;
pub use error::{EngineError, EngineResult};
pub use migrate::{AlterRequest, MigrationEngine};
pub use registry::{MigrationRegistry, SeedRegistry, UnitRegistry, UnitSource};
pub use report::{RunSummary, StatusRow, UnitReport, UnitState, UnitStatus};
pub use rollback::{table_copy_name, RollbackOptions, TableCopy, TruncateMode};
pub use seed::SeedEngine;
pub use sql::{split_statements, CsvSeed, SqlMigration, SqlSeed};
pub use unit::{AlterOptions, Migration, Seed, UnitError, UnitOutcome, UnitResult};
