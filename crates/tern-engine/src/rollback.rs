//! Rolling a unit back to a recorded version
//!
//! The snapshot of the target version is copied over the live definition,
//! which is then re-applied. On success the target and every newer version
//! are superseded by a new version pointing at a fresh snapshot. When the
//! re-apply fails or does nothing, the live definition is put back.

use crate::error::{EngineError, EngineResult};
use crate::executor::{invoke_graph, pause, UnitExecutor};
use crate::report::{RunSummary, UnitReport, UnitStatus};
use crate::unit::UnitOutcome;
use tern_core::{guard_version, UnitFile};

/// How a seed's table is emptied before re-seeding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TruncateMode {
    /// Leave the table as it is
    #[default]
    None,
    /// Delete every row
    Direct,
    /// Copy the rows aside first and drop the copy once re-seeding succeeded
    Safe,
}

/// Options for a rollback
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RollbackOptions {
    /// Do not snapshot or rewrite the ledger after re-applying
    pub no_backup: bool,
    /// Also roll back every unit reachable through declared invokes
    pub cascade: bool,
    /// Seed table handling; ignored by migrations
    pub truncate: TruncateMode,
}

/// Suffix of the table holding rows set aside by a safe truncation
pub const TABLE_COPY_SUFFIX: &str = "_tern_backup";

/// Name of the safe-truncation copy of `table`
pub fn table_copy_name(table: &str) -> String {
    format!("{}{}", table, TABLE_COPY_SUFFIX)
}

/// Rows of a table set aside during a safe truncation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCopy {
    pub table: String,
    pub copy: String,
}

/// Resolves rollback targets and drives the restore against an engine
pub(crate) struct RollbackResolver<'a, E: ?Sized> {
    engine: &'a E,
}

impl<'a, E> RollbackResolver<'a, E>
where
    E: UnitExecutor + ?Sized,
{
    pub(crate) fn new(engine: &'a E) -> Self {
        Self { engine }
    }

    /// Roll `name` back to `target`, cascading when requested
    ///
    /// Failures of the named unit are returned as errors. Failures of
    /// cascaded units are reported and do not stop the remaining ones.
    pub(crate) async fn rollback(
        &self,
        name: &str,
        target: u32,
        options: &RollbackOptions,
    ) -> EngineResult<RunSummary> {
        let order = if options.cascade {
            invoke_graph(self.engine, name)?.cascade_order(name)
        } else {
            vec![name.to_string()]
        };

        let mut summary = RunSummary::new();
        let root = self.rollback_unit(name, target, options).await?;
        let root_executed = root.executed();
        let root_message = root.message.clone();
        summary.push(root);

        if !summary.any_succeeded() {
            return Err(EngineError::NothingExecuted {
                name: name.to_string(),
                reason: root_message.unwrap_or_else(|| "no unit executed".to_string()),
            });
        }
        if !root_executed {
            return Ok(summary);
        }

        let unit_delay = self.engine.engine_settings().pacing.unit_delay();
        for child in order.iter().skip(1) {
            pause(unit_delay).await;
            let report = self
                .rollback_unit(child, target, options)
                .await
                .unwrap_or_else(|e| {
                    log::warn!("Cascaded rollback of {} failed: {}", child, e);
                    UnitReport::failed(child, &e)
                });
            summary.push(report);
        }
        Ok(summary)
    }

    async fn rollback_unit(
        &self,
        name: &str,
        target: u32,
        options: &RollbackOptions,
    ) -> EngineResult<UnitReport> {
        let unit = self.engine.resolve_unit(name)?;
        let books = self.engine.books();
        let ledger = books.load()?;

        let entry = ledger.get(name).ok_or_else(|| EngineError::NoLockFound {
            name: name.to_string(),
        })?;
        if entry.metadata.is_empty() {
            return Err(EngineError::NoMetadata {
                name: name.to_string(),
            });
        }
        if target == entry.latest_version {
            return Err(EngineError::InvalidTarget {
                name: name.to_string(),
                version: target,
            });
        }
        let row = entry
            .version(target)
            .ok_or_else(|| EngineError::UnknownVersion {
                name: name.to_string(),
                version: target,
            })?;

        if guard_version(&ledger, name, &unit.path, books.store(), Some(target)).is_skip() {
            log::info!("{} already matches version {}", name, target);
            return Ok(UnitReport::new(name, UnitStatus::AlreadyApplied).with_version(Some(target)));
        }

        let previous = books.read_definition(&unit)?;
        books.store().restore(&row.backup, &unit.path)?;
        log::info!("Restored {} to version {}", name, target);

        let result = match self.engine.before_reapply(&unit, options).await {
            Ok(copy) => {
                let result = self.engine.execute_unit(&unit).await;
                let succeeded = matches!(result, Ok(UnitOutcome::Applied));
                self.engine.after_reapply(copy, succeeded).await;
                result
            }
            Err(e) => Err(e),
        };
        if !matches!(result, Ok(UnitOutcome::Applied)) {
            self.put_back(&unit, &previous);
        }

        match result? {
            UnitOutcome::NoOp(reason) => {
                log::info!("{} reported nothing to do after restore: {}", name, reason);
                Ok(UnitReport::new(name, UnitStatus::NoOp).with_message(reason))
            }
            UnitOutcome::Applied => {
                let version = if options.no_backup {
                    None
                } else {
                    Some(books.rewrite(&unit, target)?)
                };
                Ok(UnitReport::new(name, UnitStatus::RolledBack).with_version(version))
            }
        }
    }

    /// Return the live definition to what it was before the restore
    fn put_back(&self, unit: &UnitFile, previous: &[u8]) {
        match self.engine.books().put_back(unit, previous) {
            Ok(()) => log::info!("Put {} back to its definition before the rollback", unit.name),
            Err(e) => log::warn!("Could not put {} back after a failed rollback: {}", unit.name, e),
        }
    }
}
