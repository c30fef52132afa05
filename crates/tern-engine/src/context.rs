//! Execution context handed to units
//!
//! Carries the database collaborator and the open transaction across the
//! phases of one unit. In dry-run mode statements are recorded instead of
//! executed.

use crate::error::{EngineError, EngineResult};
use crate::sql::split_statements;
use crate::unit::{UnitError, UnitOutcome};
use std::sync::Arc;
use tern_db::{quote_qualified, Database, DbError, DbResult};

/// Outcome of a unit's phases, or the phase that failed
pub(crate) type PhaseResult = Result<UnitOutcome, (&'static str, UnitError)>;

/// Per-unit execution context
pub struct ExecutionContext {
    db: Arc<dyn Database>,
    dry_run: bool,
    statements: Vec<String>,
}

impl ExecutionContext {
    /// Context that executes against the database
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self {
            db,
            dry_run: false,
            statements: Vec::new(),
        }
    }

    /// Context that only records what would be executed
    pub fn dry_run(db: Arc<dyn Database>) -> Self {
        Self {
            db,
            dry_run: true,
            statements: Vec::new(),
        }
    }

    /// Whether statements are recorded instead of executed
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Database collaborator, for read-only inspection
    pub fn db(&self) -> &dyn Database {
        self.db.as_ref()
    }

    /// Execute one statement
    pub async fn execute(&mut self, sql: &str) -> DbResult<usize> {
        self.statements.push(sql.trim().to_string());
        if self.dry_run {
            return Ok(0);
        }
        self.db.execute(sql).await
    }

    /// Execute a script of one or more statements
    pub async fn execute_script(&mut self, sql: &str) -> DbResult<()> {
        self.statements.extend(split_statements(sql));
        if self.dry_run {
            return Ok(());
        }
        self.db.execute_batch(sql).await
    }

    /// Remove every row of a table
    pub async fn truncate(&mut self, table: &str) -> DbResult<()> {
        self.statements
            .push(format!("DELETE FROM {}", quote_qualified(table)));
        if self.dry_run {
            return Ok(());
        }
        self.db.truncate(table).await
    }

    /// Load a CSV file into a table
    pub async fn append_csv(&mut self, table: &str, path: &str) -> DbResult<()> {
        self.statements
            .push(format!("INSERT INTO {} FROM CSV '{}'", quote_qualified(table), path));
        if self.dry_run {
            return Ok(());
        }
        self.db.append_csv(table, path).await
    }

    /// Open a transaction, joining one that is already open
    pub async fn begin(&mut self) -> DbResult<()> {
        if self.dry_run || self.db.in_transaction() {
            return Ok(());
        }
        self.db.begin().await
    }

    /// Commit the open transaction, if any
    pub async fn commit(&mut self) -> DbResult<()> {
        if self.dry_run || !self.db.in_transaction() {
            return Ok(());
        }
        self.db.commit().await
    }

    /// Roll back the open transaction, if any
    pub async fn rollback(&mut self) -> DbResult<()> {
        if self.dry_run {
            return Ok(());
        }
        self.db.rollback().await
    }

    /// Whether a transaction is open
    pub fn in_transaction(&self) -> bool {
        !self.dry_run && self.db.in_transaction()
    }

    /// Commit on success, roll back on a no-op or failure
    pub(crate) async fn settle(&mut self, name: &str, result: PhaseResult) -> EngineResult<UnitOutcome> {
        let tx_failure = |source: DbError| EngineError::TransactionFailure {
            name: name.to_string(),
            source,
        };
        match result {
            Ok(UnitOutcome::Applied) => {
                self.commit().await.map_err(tx_failure)?;
                Ok(UnitOutcome::Applied)
            }
            Ok(noop) => {
                self.rollback().await.map_err(tx_failure)?;
                Ok(noop)
            }
            Err((phase, source)) => {
                if let Err(e) = self.rollback().await {
                    log::warn!("Rollback after failed {} of {} also failed: {}", phase, name, e);
                }
                Err(EngineError::UnitExecution {
                    name: name.to_string(),
                    phase,
                    source,
                })
            }
        }
    }

    /// Statements issued so far
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// Drain the issued statements
    pub fn take_statements(&mut self) -> Vec<String> {
        std::mem::take(&mut self.statements)
    }
}
