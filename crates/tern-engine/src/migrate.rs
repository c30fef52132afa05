//! Migration engine
//!
//! Applying a migration runs `down()` then `up()` in one transaction, so a
//! changed definition replaces the previous one. Dropping runs `down()` only
//! and removes the newest recorded version.

use crate::books::{Books, EngineSettings};
use crate::context::{ExecutionContext, PhaseResult};
use crate::error::{EngineError, EngineResult};
use crate::executor::{self, pause, UnitExecutor};
use crate::registry::MigrationRegistry;
use crate::report::{RunSummary, StatusRow, UnitReport, UnitStatus};
use crate::rollback::{RollbackOptions, RollbackResolver};
use crate::unit::{AlterOptions, Migration, UnitError, UnitOutcome};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tern_core::{Config, Ledger, UnitFile, UnitKind};
use tern_db::Database;

/// Options for [`MigrationEngine::alter_one`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlterRequest {
    /// Drop columns absent from the new definition
    pub drop_extra_columns: bool,
    /// Report the statements instead of executing them
    pub dry_run: bool,
}

/// Applies, drops, alters and rolls back migrations
pub struct MigrationEngine {
    settings: EngineSettings,
    registry: MigrationRegistry,
    db: Arc<dyn Database>,
    books: Books,
}

impl MigrationEngine {
    pub fn new(
        settings: EngineSettings,
        registry: MigrationRegistry,
        db: Arc<dyn Database>,
    ) -> Self {
        let books = Books::new(&settings);
        Self {
            settings,
            registry,
            db,
            books,
        }
    }

    /// Engine for a project, with the built-in `.sql` migrations
    pub fn from_config(config: &Config, root: &Path, db: Arc<dyn Database>) -> Self {
        Self::new(
            EngineSettings::from_config(config, root, UnitKind::Migration),
            MigrationRegistry::with_defaults(),
            db,
        )
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Registry, for registering custom migration constructors
    pub fn registry_mut(&mut self) -> &mut MigrationRegistry {
        &mut self.registry
    }

    /// Migrations in discovery order
    pub fn discover(&self) -> EngineResult<Vec<UnitFile>> {
        executor::discover(&self.settings, &self.registry)
    }

    /// Current ledger document
    pub fn ledger(&self) -> EngineResult<Ledger> {
        self.books.load()
    }

    /// Run one migration in its own transaction, without guard or ledger
    ///
    /// With `drop_only` only `down()` runs.
    pub async fn apply(&self, unit: &UnitFile, drop_only: bool) -> EngineResult<UnitOutcome> {
        let migration = self.registry.instantiate(unit)?;
        let name = unit.name.as_str();
        let mut ctx = ExecutionContext::new(self.db.clone());
        ctx.begin()
            .await
            .map_err(|source| EngineError::TransactionFailure {
                name: name.to_string(),
                source,
            })?;

        let result = self.run_phases(migration.as_ref(), &mut ctx, drop_only).await;
        ctx.settle(name, result).await
    }

    async fn run_phases(
        &self,
        migration: &dyn Migration,
        ctx: &mut ExecutionContext,
        drop_only: bool,
    ) -> PhaseResult {
        let down = migration.down(ctx).await.map_err(|e| ("down", e))?;
        if drop_only {
            return Ok(down);
        }
        pause(self.settings.pacing.phase_delay()).await;
        migration.up(ctx).await.map_err(|e| ("up", e))
    }

    /// Apply every changed migration in discovery order
    pub async fn apply_all(&self, cascade: bool) -> EngineResult<RunSummary> {
        let _guard = self.books.lock()?;
        let units = self.discover()?;
        log::info!("Found {} migrations", units.len());

        let mut visited = HashSet::new();
        let mut summary = RunSummary::new();
        for unit in &units {
            if visited.contains(unit.name.as_str()) {
                continue;
            }
            executor::run_from(self, unit, cascade, &mut visited, &mut summary).await?;
        }
        Ok(summary)
    }

    /// Apply one migration, and what it invokes when `cascade` is set
    pub async fn apply_one(&self, name: &str, cascade: bool) -> EngineResult<RunSummary> {
        let _guard = self.books.lock()?;
        let unit = self.resolve_unit(name)?;
        let mut summary = RunSummary::new();
        executor::run_from(self, &unit, cascade, &mut HashSet::new(), &mut summary).await?;
        Ok(summary)
    }

    /// Drop every migration in reverse discovery order
    pub async fn drop_all(&self) -> EngineResult<RunSummary> {
        let _guard = self.books.lock()?;
        let units = self.discover()?;

        let mut summary = RunSummary::new();
        for unit in units.iter().rev() {
            if !summary.is_empty() {
                pause(self.settings.pacing.unit_delay()).await;
            }
            let report = self.drop_unit(unit).await.unwrap_or_else(|e| {
                log::error!("{}", e);
                UnitReport::failed(unit.name.as_str(), &e)
            });
            summary.push(report);
        }
        Ok(summary)
    }

    /// Drop one migration
    pub async fn drop_one(&self, name: &str) -> EngineResult<UnitReport> {
        let _guard = self.books.lock()?;
        let unit = self.resolve_unit(name)?;
        self.drop_unit(&unit).await
    }

    async fn drop_unit(&self, unit: &UnitFile) -> EngineResult<UnitReport> {
        let name = unit.name.as_str();
        match self.apply(unit, true).await? {
            UnitOutcome::Applied => {
                let dropped = self.books.record_drop(name)?;
                log::info!("{} dropped", name);
                Ok(UnitReport::new(name, UnitStatus::Dropped).with_version(dropped))
            }
            UnitOutcome::NoOp(reason) => {
                log::info!("{} reported nothing to drop: {}", name, reason);
                Ok(UnitReport::new(name, UnitStatus::NoOp).with_message(reason))
            }
        }
    }

    /// Run `up()` then `alter()` for one migration
    ///
    /// In dry-run mode nothing is executed or recorded and the report lists
    /// the statements that would run.
    pub async fn alter_one(&self, name: &str, request: AlterRequest) -> EngineResult<UnitReport> {
        let _guard = self.books.lock()?;
        let unit = self.resolve_unit(name)?;

        if !request.dry_run && self.books.guard(&unit, None)?.is_skip() {
            log::debug!("{} is unchanged, skipping alter", name);
            return Ok(UnitReport::new(name, UnitStatus::Skipped));
        }

        let migration = self.registry.instantiate(&unit)?;
        let mut ctx = if request.dry_run {
            ExecutionContext::dry_run(self.db.clone())
        } else {
            ExecutionContext::new(self.db.clone())
        };
        ctx.begin()
            .await
            .map_err(|source| EngineError::TransactionFailure {
                name: name.to_string(),
                source,
            })?;

        let options = AlterOptions {
            drop_extra_columns: request.drop_extra_columns,
        };
        let result = self.run_alter(migration.as_ref(), &mut ctx, options).await;
        if let Err((_, UnitError::Unsupported { .. })) = &result {
            if let Err(e) = ctx.rollback().await {
                log::warn!("Failed to roll back alter of {}: {}", name, e);
            }
            return Err(EngineError::InvalidBaseType {
                name: name.to_string(),
                kind: UnitKind::Migration,
                reason: "it does not define an alter operation".to_string(),
            });
        }

        let outcome = ctx.settle(name, result).await?;
        let statements = ctx.take_statements();
        if request.dry_run {
            return Ok(UnitReport::new(name, UnitStatus::Planned).with_statements(statements));
        }

        match outcome {
            UnitOutcome::Applied => {
                let version = self.books.record(&unit)?;
                log::info!("{} altered (version {})", name, version);
                Ok(UnitReport::new(name, UnitStatus::Applied)
                    .with_version(Some(version))
                    .with_statements(statements))
            }
            UnitOutcome::NoOp(reason) => {
                Ok(UnitReport::new(name, UnitStatus::NoOp).with_message(reason))
            }
        }
    }

    async fn run_alter(
        &self,
        migration: &dyn Migration,
        ctx: &mut ExecutionContext,
        options: AlterOptions,
    ) -> PhaseResult {
        migration.up(ctx).await.map_err(|e| ("up", e))?;
        pause(self.settings.pacing.phase_delay()).await;
        migration.alter(ctx, options).await.map_err(|e| ("alter", e))
    }

    /// Roll one migration back to a recorded version
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

    /// Forget one migration's history, or all of it
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

    /// Ledger state of every migration
    pub fn status(&self) -> EngineResult<Vec<StatusRow>> {
        let units = self.discover()?;
        executor::status(self, &units)
    }
}

#[async_trait]
impl UnitExecutor for MigrationEngine {
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
        self.apply(unit, false).await
    }
}

#[cfg(test)]
#[path = "migrate_test.rs"]
mod tests;
