//! Status command implementation

use anyhow::Result;
use serde::Serialize;
use tern_engine::StatusRow;

use crate::cli::{ContextArg, GlobalArgs, OutputFormat, StatusArgs};
use crate::commands::common::Project;

#[derive(Debug, Default, Serialize)]
struct StatusOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    migrations: Option<Vec<StatusRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seeds: Option<Vec<StatusRow>>,
}

/// Execute the status command
pub(crate) async fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let mut output = StatusOutput::default();

    if args.context != Some(ContextArg::Seeds) {
        output.migrations = Some(project.migration_engine()?.status()?);
    }
    if args.context != Some(ContextArg::Migrations) {
        output.seeds = Some(project.seed_engine()?.status()?);
    }

    if global.output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if let Some(rows) = &output.migrations {
        print_table("Migrations", rows);
    }
    if let Some(rows) = &output.seeds {
        print_table("Seeds", rows);
    }
    Ok(())
}

fn print_table(title: &str, rows: &[StatusRow]) {
    println!("{}:", title);
    if rows.is_empty() {
        println!("  (none)\n");
        return;
    }

    let width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0).max(4);
    println!("  {:<width$}  {:<9}  {:>7}  {:>8}", "NAME", "STATE", "VERSION", "HISTORY");
    for row in rows {
        println!("{}", format_row(row, width));
    }
    println!();
}

fn format_row(row: &StatusRow, width: usize) -> String {
    let version = row
        .latest_version
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut line = format!(
        "  {:<width$}  {:<9}  {:>7}  {:>8}",
        row.name,
        row.state.to_string(),
        version,
        row.versions
    );
    if row.backup_missing {
        line.push_str("  (backup missing)");
    }
    line
}
