//! Orchestration shared by the migration and seed engines
//!
//! Both engines run units the same way: consult the version guard, execute
//! the unit inside its own transaction, then snapshot and record the
//! definition. Cascades follow declared invokes depth-first, each unit at
//! most once per run, and only below units that actually executed.

use crate::books::{Books, EngineSettings};
use crate::error::{EngineError, EngineResult};
use crate::registry::UnitRegistry;
use crate::report::{RunSummary, StatusRow, UnitReport, UnitState, UnitStatus};
use crate::rollback::{RollbackOptions, TableCopy};
use crate::unit::UnitOutcome;
use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;
use tern_core::{discover_units, find_unit, guard_version, InvokeGraph, UnitFile};

/// Engine-specific steps plugged into the shared orchestration
#[async_trait]
pub(crate) trait UnitExecutor: Send + Sync {
    fn books(&self) -> &Books;

    fn engine_settings(&self) -> &EngineSettings;

    /// Locate a unit by identifier
    fn resolve_unit(&self, name: &str) -> EngineResult<UnitFile>;

    /// Invokes declared by the current definition of a unit
    fn declared_invokes(&self, unit: &UnitFile) -> EngineResult<Vec<String>>;

    /// Run the unit in its own transaction without touching the ledger
    async fn execute_unit(&self, unit: &UnitFile) -> EngineResult<UnitOutcome>;

    /// Prepare the database before a rolled-back definition is re-applied
    async fn before_reapply(
        &self,
        _unit: &UnitFile,
        _options: &RollbackOptions,
    ) -> EngineResult<Option<TableCopy>> {
        Ok(None)
    }

    /// Clean up after a re-apply
    async fn after_reapply(&self, _copy: Option<TableCopy>, _succeeded: bool) {}
}

/// Sleep for a pacing delay; zero means no pause
pub(crate) async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Units of an engine's directory that the registry can instantiate
pub(crate) fn discover<T: ?Sized>(
    settings: &EngineSettings,
    registry: &UnitRegistry<T>,
) -> EngineResult<Vec<UnitFile>> {
    let units = discover_units(&settings.unit_dir, &settings.namespace)?;
    Ok(units
        .into_iter()
        .filter(|unit| {
            let supported = registry.supports(unit);
            if !supported {
                log::debug!("Ignoring {}: no constructor", unit.path.display());
            }
            supported
        })
        .collect())
}

pub(crate) fn resolve(settings: &EngineSettings, name: &str) -> EngineResult<UnitFile> {
    find_unit(&settings.unit_dir, &settings.namespace, name)?.ok_or_else(|| {
        EngineError::UnitNotFound {
            name: name.to_string(),
        }
    })
}

/// Graph of units reachable from `root` through declared invokes
///
/// Units that cannot be resolved contribute no edges here; they fail
/// individually when the cascade reaches them.
pub(crate) fn invoke_graph<E>(engine: &E, root: &str) -> EngineResult<InvokeGraph>
where
    E: UnitExecutor + ?Sized,
{
    let graph = InvokeGraph::build(root, |name| {
        let invokes = engine
            .resolve_unit(name)
            .and_then(|unit| engine.declared_invokes(&unit))
            .unwrap_or_default();
        Ok(invokes)
    })?;
    graph.validate()?;
    Ok(graph)
}

/// Guard, execute and record one unit
pub(crate) async fn process<E>(engine: &E, unit: &UnitFile) -> EngineResult<UnitReport>
where
    E: UnitExecutor + ?Sized,
{
    let name = unit.name.as_str();
    if engine.books().guard(unit, None)?.is_skip() {
        log::debug!("{} is unchanged, skipping", name);
        return Ok(UnitReport::new(name, UnitStatus::Skipped));
    }

    match engine.execute_unit(unit).await? {
        UnitOutcome::Applied => {
            let version = engine.books().record(unit)?;
            log::info!("{} applied (version {})", name, version);
            Ok(UnitReport::new(name, UnitStatus::Applied).with_version(Some(version)))
        }
        UnitOutcome::NoOp(reason) => {
            log::info!("{} reported nothing to do: {}", name, reason);
            Ok(UnitReport::new(name, UnitStatus::NoOp).with_message(reason))
        }
    }
}

/// Process `root` and, when `cascade` is set, everything it invokes
///
/// Per-unit failures become failed reports. A cyclic invoke aborts before
/// anything runs.
pub(crate) async fn run_from<E>(
    engine: &E,
    root: &UnitFile,
    cascade: bool,
    visited: &mut HashSet<String>,
    summary: &mut RunSummary,
) -> EngineResult<()>
where
    E: UnitExecutor + ?Sized,
{
    let graph = if cascade {
        Some(invoke_graph(engine, root.name.as_str())?)
    } else {
        None
    };
    let unit_delay = engine.engine_settings().pacing.unit_delay();

    let mut stack = vec![root.name.to_string()];
    while let Some(name) = stack.pop() {
        if !visited.insert(name.clone()) {
            continue;
        }
        if !summary.is_empty() {
            pause(unit_delay).await;
        }

        let result = match engine.resolve_unit(&name) {
            Ok(unit) => process(engine, &unit).await,
            Err(e) => Err(e),
        };
        let report = result.unwrap_or_else(|e| {
            log::error!("{}", e);
            UnitReport::failed(&name, &e)
        });

        let executed = report.executed();
        summary.push(report);

        let Some(graph) = graph.as_ref().filter(|_| executed) else {
            continue;
        };
        for invoked in graph.invokes_of(&name).iter().rev() {
            if !visited.contains(invoked) {
                stack.push(invoked.clone());
            }
        }
    }
    Ok(())
}

/// Ledger state of every discovered or recorded unit
pub(crate) fn status<E>(engine: &E, units: &[UnitFile]) -> EngineResult<Vec<StatusRow>>
where
    E: UnitExecutor + ?Sized,
{
    let books = engine.books();
    let ledger = books.load()?;
    let missing: HashSet<String> = ledger
        .missing_backups(books.store())
        .into_iter()
        .map(|(name, _, _)| name)
        .collect();

    let mut rows: Vec<StatusRow> = units
        .iter()
        .map(|unit| {
            let name = unit.name.as_str();
            let entry = ledger.get(name);
            let state = match entry {
                None => UnitState::Pending,
                Some(_) => {
                    if guard_version(&ledger, name, &unit.path, books.store(), None).is_skip() {
                        UnitState::Current
                    } else {
                        UnitState::Changed
                    }
                }
            };
            StatusRow {
                name: name.to_string(),
                state,
                latest_version: entry.map(|e| e.latest_version),
                versions: entry.map_or(0, |e| e.metadata.len()),
                backup_missing: missing.contains(name),
            }
        })
        .collect();

    let known: HashSet<&str> = units.iter().map(|u| u.name.as_str()).collect();
    for (name, entry) in ledger.iter() {
        if !known.contains(name) {
            rows.push(StatusRow {
                name: name.to_string(),
                state: UnitState::Orphaned,
                latest_version: Some(entry.latest_version),
                versions: entry.metadata.len(),
                backup_missing: missing.contains(name),
            });
        }
    }
    Ok(rows)
}
