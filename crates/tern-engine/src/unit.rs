//! Unit contracts implemented by migrations and seeds
//!
//! Units report their outcome explicitly: a unit can run without error and
//! still report that it did nothing, in which case the engine rolls the
//! transaction back and records no version.

use crate::context::ExecutionContext;
use async_trait::async_trait;
use tern_db::DbError;
use thiserror::Error;

/// What a unit phase did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    /// The phase changed the database
    Applied,
    /// The phase ran but had nothing to do
    NoOp(String),
}

impl UnitOutcome {
    /// Build a no-op outcome with a reason
    pub fn noop(reason: impl Into<String>) -> Self {
        UnitOutcome::NoOp(reason.into())
    }

    /// Whether the phase reported success
    pub fn is_applied(&self) -> bool {
        matches!(self, UnitOutcome::Applied)
    }
}

/// Failure raised by a unit
#[derive(Error, Debug)]
pub enum UnitError {
    /// A statement issued by the unit failed
    #[error(transparent)]
    Db(#[from] DbError),

    /// The unit failed for its own reasons
    #[error("{0}")]
    Failed(String),

    /// The unit does not implement an optional operation
    #[error("{operation} is not supported by this unit")]
    Unsupported { operation: &'static str },
}

/// Result of one unit phase
pub type UnitResult = Result<UnitOutcome, UnitError>;

/// Options passed to [`Migration::alter`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlterOptions {
    /// Drop columns that are absent from the new definition
    pub drop_extra_columns: bool,
}

/// A schema-change unit
#[async_trait]
pub trait Migration: Send + Sync {
    /// Apply the definition
    async fn up(&self, ctx: &mut ExecutionContext) -> UnitResult;

    /// Revert the definition
    async fn down(&self, ctx: &mut ExecutionContext) -> UnitResult;

    /// Bring an existing schema in line with the definition
    async fn alter(&self, _ctx: &mut ExecutionContext, _options: AlterOptions) -> UnitResult {
        Err(UnitError::Unsupported { operation: "alter" })
    }

    /// Identifiers of migrations to process after this one
    fn invokes(&self) -> Vec<String> {
        Vec::new()
    }
}

/// A data-seeding unit
#[async_trait]
pub trait Seed: Send + Sync {
    /// Insert the seed data
    async fn run(&self, ctx: &mut ExecutionContext) -> UnitResult;

    /// Identifiers of seeds to run after this one
    fn invokes(&self) -> Vec<String> {
        Vec::new()
    }

    /// Table populated by this seed, used for truncation before rollback
    fn table(&self) -> Option<String> {
        None
    }
}
