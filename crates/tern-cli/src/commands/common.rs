//! Shared helpers for command implementations

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tern_core::Config;
use tern_db::{Database, DuckDbBackend};
use tern_engine::{MigrationEngine, RunSummary, SeedEngine, UnitReport, UnitStatus};

use crate::cli::{GlobalArgs, OutputFormat};

/// Exit status used when a bulk run had at least one failed unit.
pub(crate) const BULK_FAILURE_EXIT: i32 = 4;

/// Structured exit code error to avoid `std::process::exit()` inside commands.
///
/// `main` downcasts this and exits with the carried code; the failure itself
/// has already been reported.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exit code {}", self.0)
    }
}

impl std::error::Error for ExitCode {}

/// Loaded project: root directory plus configuration
pub(crate) struct Project {
    pub(crate) root: PathBuf,
    pub(crate) config: Config,
}

impl Project {
    /// Load the project named by the global arguments
    pub(crate) fn load(global: &GlobalArgs) -> Result<Self> {
        let root = PathBuf::from(&global.project_dir);
        let mut config = match &global.config {
            Some(path) => Config::load(Path::new(path)),
            None => Config::load_from_dir(&root),
        }
        .context("Failed to load configuration")?;

        if let Some(database) = &global.database {
            config.database.path = database.clone();
        }
        Ok(Self { root, config })
    }

    /// Database path, resolved against the project root
    pub(crate) fn database_path(&self) -> String {
        let path = &self.config.database.path;
        if path == ":memory:" || Path::new(path).is_absolute() {
            path.clone()
        } else {
            self.root.join(path).display().to_string()
        }
    }

    pub(crate) fn open_database(&self) -> Result<Arc<dyn Database>> {
        let path = self.database_path();
        log::debug!("Opening database {}", path);
        let db = DuckDbBackend::new(&path)
            .with_context(|| format!("Failed to open database: {}", path))?;
        Ok(Arc::new(db))
    }

    pub(crate) fn migration_engine(&self) -> Result<MigrationEngine> {
        Ok(MigrationEngine::from_config(
            &self.config,
            &self.root,
            self.open_database()?,
        ))
    }

    pub(crate) fn seed_engine(&self) -> Result<SeedEngine> {
        Ok(SeedEngine::from_config(
            &self.config,
            &self.root,
            self.open_database()?,
        ))
    }
}

/// Await `work` behind a spinner (text output only)
pub(crate) async fn with_spinner<F, T>(global: &GlobalArgs, message: &str, work: F) -> T
where
    F: Future<Output = T>,
{
    if global.output == OutputFormat::Json {
        return work.await;
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    let result = work.await;
    pb.finish_and_clear();
    result
}

/// Format one report as a console line
pub(crate) fn format_report(report: &UnitReport) -> String {
    let version = report
        .version
        .map(|v| format!(" (version {})", v))
        .unwrap_or_default();
    match report.status {
        UnitStatus::Failed => format!(
            "  ✗ {} - {}",
            report.name,
            report.message.as_deref().unwrap_or("failed")
        ),
        UnitStatus::Skipped | UnitStatus::AlreadyApplied => {
            format!("  - {} ({})", report.name, report.status)
        }
        UnitStatus::NoOp => format!(
            "  - {} (no-op: {})",
            report.name,
            report.message.as_deref().unwrap_or("nothing to do")
        ),
        _ => format!("  ✓ {} {}{}", report.name, report.status, version),
    }
}

/// Print a run summary in the selected format
pub(crate) fn print_summary(summary: &RunSummary, global: &GlobalArgs) -> Result<()> {
    if global.output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    if summary.is_empty() {
        println!("Nothing to do");
        return Ok(());
    }
    for report in &summary.reports {
        println!("{}", format_report(report));
        for statement in &report.statements {
            println!("      {};", statement);
        }
    }

    let executed = summary.reports.iter().filter(|r| r.executed()).count();
    let skipped = summary.count(UnitStatus::Skipped)
        + summary.count(UnitStatus::NoOp)
        + summary.count(UnitStatus::AlreadyApplied);
    let failed = summary.count(UnitStatus::Failed);
    println!();
    println!(
        "Done: {} executed, {} skipped, {} failed",
        executed, skipped, failed
    );
    Ok(())
}

/// Print a single report in the selected format
pub(crate) fn print_report(report: &UnitReport, global: &GlobalArgs) -> Result<()> {
    let mut summary = RunSummary::new();
    summary.push(report.clone());
    print_summary(&summary, global)
}

/// Exit status for a finished run
///
/// A lone failed unit exits with its own error code; any failure among
/// several units exits with [`BULK_FAILURE_EXIT`].
pub(crate) fn summary_exit_code(summary: &RunSummary) -> Option<i32> {
    let failures: Vec<&UnitReport> = summary.failures().collect();
    match failures.as_slice() {
        [] => None,
        [only] if summary.len() == 1 => Some(only.exit_code),
        _ => Some(BULK_FAILURE_EXIT),
    }
}

/// Turn a finished run into the command result
pub(crate) fn finish(summary: &RunSummary) -> Result<()> {
    match summary_exit_code(summary) {
        Some(code) => Err(ExitCode(code).into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_engine::EngineError;

    fn failed(name: &str) -> UnitReport {
        UnitReport::failed(
            name,
            &EngineError::UnitNotFound {
                name: name.to_string(),
            },
        )
    }

    #[test]
    fn test_exit_code_single_failure() {
        let mut summary = RunSummary::new();
        summary.push(failed("a"));
        assert_eq!(summary_exit_code(&summary), Some(10));
    }

    #[test]
    fn test_exit_code_bulk_failure() {
        let mut summary = RunSummary::new();
        summary.push(UnitReport::new("a", UnitStatus::Applied));
        summary.push(failed("b"));
        assert_eq!(summary_exit_code(&summary), Some(BULK_FAILURE_EXIT));
    }

    #[test]
    fn test_exit_code_success() {
        let mut summary = RunSummary::new();
        summary.push(UnitReport::new("a", UnitStatus::Skipped));
        assert_eq!(summary_exit_code(&summary), None);
        assert!(finish(&summary).is_ok());
    }

    #[test]
    fn test_format_report() {
        let line = format_report(&UnitReport::new("a", UnitStatus::Applied).with_version(Some(2)));
        assert_eq!(line, "  ✓ a applied (version 2)");
        assert!(format_report(&failed("b")).starts_with("  ✗ b - [T001]"));
    }
}
