//! Seed engine
//!
//! Seeds are guarded and recorded like migrations but run a single `run()`
//! phase. Rolling a seed back can empty its table first, optionally keeping
//! a copy of the rows until re-seeding succeeds.

use crate::books::{Books, EngineSettings};
use crate::context::ExecutionContext;
use crate::error::{EngineError, EngineResult};
use crate::executor::{self, UnitExecutor};
use crate::registry::SeedRegistry;
use crate::report::{RunSummary, StatusRow};
use crate::rollback::{table_copy_name, RollbackOptions, RollbackResolver, TableCopy, TruncateMode};
use crate::unit::UnitOutcome;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tern_core::{Config, Ledger, UnitFile, UnitKind};
use tern_db::{quote_qualified, Database, DbError};

/// Runs and rolls back seeds
pub struct SeedEngine {
    settings: EngineSettings,
    registry: SeedRegistry,
    db: Arc<dyn Database>,
    books: Books,
}

impl SeedEngine {
    pub fn new(settings: EngineSettings, registry: SeedRegistry, db: Arc<dyn Database>) -> Self {
        let books = Books::new(&settings);
        Self {
            settings,
            registry,
            db,
            books,
        }
    }

    /// Engine for a project, with the built-in `.sql` and `.csv` seeds
    pub fn from_config(config: &Config, root: &Path, db: Arc<dyn Database>) -> Self {
        Self::new(
            EngineSettings::from_config(config, root, UnitKind::Seed),
            SeedRegistry::with_defaults(),
            db,
        )
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Registry, for registering custom seed constructors
    pub fn registry_mut(&mut self) -> &mut SeedRegistry {
        &mut self.registry
    }

    /// Seeds in discovery order
    pub fn discover(&self) -> EngineResult<Vec<UnitFile>> {
        executor::discover(&self.settings, &self.registry)
    }

    /// Current ledger document
    pub fn ledger(&self) -> EngineResult<Ledger> {
        self.books.load()
    }

    /// Run one seed in its own transaction, without guard or ledger
    pub async fn seed(&self, unit: &UnitFile) -> EngineResult<UnitOutcome> {
        let seed = self.registry.instantiate(unit)?;
        let name = unit.name.as_str();
        let mut ctx = ExecutionContext::new(self.db.clone());
        ctx.begin()
            .await
            .map_err(|source| EngineError::TransactionFailure {
                name: name.to_string(),
                source,
            })?;

        let result = seed.run(&mut ctx).await.map_err(|e| ("run", e));
        ctx.settle(name, result).await
    }

    /// Run every changed seed in discovery order
    pub async fn run_all(&self, invoke: bool) -> EngineResult<RunSummary> {
        let _guard = self.books.lock()?;
        let units = self.discover()?;
        log::info!("Found {} seeds", units.len());

        let mut visited = HashSet::new();
        let mut summary = RunSummary::new();
        for unit in &units {
            if visited.contains(unit.name.as_str()) {
                continue;
            }
            executor::run_from(self, unit, invoke, &mut visited, &mut summary).await?;
        }
        Ok(summary)
    }

    /// Run one seed, and the seeds it invokes when `invoke` is set
    pub async fn run_one(&self, name: &str, invoke: bool) -> EngineResult<RunSummary> {
        let _guard = self.books.lock()?;
        let unit = self.resolve_unit(name)?;
        let mut summary = RunSummary::new();
        executor::run_from(self, &unit, invoke, &mut HashSet::new(), &mut summary).await?;
        Ok(summary)
    }

    /// Roll one seed back to a recorded version
    pub async fn rollback_one(
        &self,
        name: &str,
        target: u32,
        options: RollbackOptions,
    ) -> EngineResult<RunSummary> {
        let _guard = self.books.lock()?;
        RollbackResolver::new(self)
            .rollback(name, target, &options)
            .await
    }

    /// Put back the rows a failed safe rollback set aside; returns the row count
    pub async fn restore_table(&self, table: &str) -> EngineResult<usize> {
        let copy = table_copy_name(table);
        if !self.db.relation_exists(&copy).await? {
            return Err(DbError::TableNotFound(copy).into());
        }

        self.db.begin().await?;
        let restored = match self.refill(table, &copy).await {
            Ok(rows) => {
                self.db.commit().await?;
                rows
            }
            Err(e) => {
                if let Err(rb) = self.db.rollback().await {
                    log::warn!("Rollback of restore into {} failed: {}", table, rb);
                }
                return Err(e.into());
            }
        };

        self.db.drop_if_exists(&copy).await?;
        log::info!("Restored {} rows into {} from {}", restored, table, copy);
        Ok(restored)
    }

    async fn refill(&self, table: &str, copy: &str) -> Result<usize, DbError> {
        self.db.truncate(table).await?;
        self.db.copy_rows(copy, table).await
    }

    /// Forget one seed's history, or all of it
    pub fn clear_lock(&self, name: Option<&str>) -> EngineResult<usize> {
        let _guard = self.books.lock()?;
        self.books.clear(name)
    }

    /// Remove every row of a table
    pub async fn truncate(&self, table: &str) -> EngineResult<()> {
        self.db.truncate(table).await?;
        log::info!("Truncated {}", table);
        Ok(())
    }

    /// Ledger state of every seed
    pub fn status(&self) -> EngineResult<Vec<StatusRow>> {
        let units = self.discover()?;
        executor::status(self, &units)
    }

    /// Table a seed populates, if it declares one
    fn seed_table(&self, unit: &UnitFile) -> EngineResult<Option<String>> {
        Ok(self.registry.instantiate(unit)?.table())
    }
}

#[async_trait]
impl UnitExecutor for SeedEngine {
    fn books(&self) -> &Books {
        &self.books
    }

    fn engine_settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn resolve_unit(&self, name: &str) -> EngineResult<UnitFile> {
        executor::resolve(&self.settings, name)
    }

    fn declared_invokes(&self, unit: &UnitFile) -> EngineResult<Vec<String>> {
        Ok(self.registry.instantiate(unit)?.invokes())
    }

    async fn execute_unit(&self, unit: &UnitFile) -> EngineResult<UnitOutcome> {
        self.seed(unit).await
    }

    async fn before_reapply(
        &self,
        unit: &UnitFile,
        options: &RollbackOptions,
    ) -> EngineResult<Option<TableCopy>> {
        if options.truncate == TruncateMode::None {
            return Ok(None);
        }
        let Some(table) = self.seed_table(unit)? else {
            log::warn!("{} declares no table; nothing to truncate", unit.name);
            return Ok(None);
        };
        if !self.db.relation_exists(&table).await? {
            log::debug!("{} does not exist yet; nothing to truncate", table);
            return Ok(None);
        }

        match options.truncate {
            TruncateMode::Safe => {
                let copy = table_copy_name(&table);
                self.db
                    .create_table_as(
                        &copy,
                        &format!("SELECT * FROM {}", quote_qualified(&table)),
                        true,
                    )
                    .await?;
                self.db.truncate(&table).await?;
                log::info!("Truncated {} (rows kept in {})", table, copy);
                Ok(Some(TableCopy { table, copy }))
            }
            _ => {
                self.db.truncate(&table).await?;
                log::info!("Truncated {}", table);
                Ok(None)
            }
        }
    }

    async fn after_reapply(&self, copy: Option<TableCopy>, succeeded: bool) {
        let Some(TableCopy { table, copy }) = copy else {
            return;
        };
        if succeeded {
            if let Err(e) = self.db.drop_if_exists(&copy).await {
                log::warn!("Could not drop {}: {}", copy, e);
            }
        } else {
            log::warn!(
                "Re-seeding {} failed; previous rows are kept in {}. Run `tern seed restore-table {}` to put them back",
                table,
                copy,
                table
            );
        }
    }
}

#[cfg(test)]
#[path = "seed_test.rs"]
mod tests;
