//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// tern - versioned migrations and seeds with a lock ledger
#[derive(Parser, Debug)]
#[command(name = "tern")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override database path (DuckDB file or :memory:)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable lines
    Text,
    /// JSON document on stdout
    Json,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply changed migrations (all, or one by name)
    Migrate(MigrateArgs),

    /// Revert migrations and remove their newest recorded version
    Drop(DropArgs),

    /// Run a migration's alter phase
    Alter(AlterArgs),

    /// Restore a migration to a recorded version and re-apply it
    Rollback(RollbackArgs),

    /// Run, roll back or restore seeds
    Seed(SeedArgs),

    /// Forget recorded history
    ClearLock(ClearLockArgs),

    /// Remove every row of a table
    Truncate(TruncateArgs),

    /// Show the ledger state of each unit
    Status(StatusArgs),
}

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Migration to apply (default: all)
    pub name: Option<String>,

    /// Also apply the migrations it invokes
    #[arg(long)]
    pub cascade: bool,
}

/// Arguments for the drop command
#[derive(Args, Debug)]
pub struct DropArgs {
    /// Migration to drop (default: all, newest first)
    pub name: Option<String>,
}

/// Arguments for the alter command
#[derive(Args, Debug)]
pub struct AlterArgs {
    /// Migration to alter
    pub name: String,

    /// Also run the `alter drop` section
    #[arg(long)]
    pub drop_columns: bool,

    /// Print the statements instead of executing them
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the migration rollback command
#[derive(Args, Debug)]
pub struct RollbackArgs {
    /// Migration to roll back
    pub name: String,

    /// Version to restore
    #[arg(long = "to", value_name = "VERSION")]
    pub to: u32,

    /// Re-apply without rewriting the ledger
    #[arg(long)]
    pub no_backup: bool,

    /// Also re-apply the migrations it invokes
    #[arg(long)]
    pub cascade: bool,
}

/// Arguments for the seed command
#[derive(Args, Debug)]
pub struct SeedArgs {
    #[command(subcommand)]
    pub command: SeedCommands,
}

/// Seed subcommands
#[derive(Subcommand, Debug)]
pub enum SeedCommands {
    /// Run changed seeds (all, or one by name)
    Run(SeedRunArgs),

    /// Restore a seed to a recorded version and re-run it
    Rollback(SeedRollbackArgs),

    /// Put back rows set aside by a failed safe rollback
    RestoreTable(RestoreTableArgs),
}

/// Arguments for seed run
#[derive(Args, Debug)]
pub struct SeedRunArgs {
    /// Seed to run (default: all)
    pub name: Option<String>,

    /// Also run the seeds it invokes
    #[arg(long)]
    pub invoke: bool,
}

/// Arguments for seed rollback
#[derive(Args, Debug)]
pub struct SeedRollbackArgs {
    /// Seed to roll back
    pub name: String,

    /// Version to restore
    #[arg(long = "to", value_name = "VERSION")]
    pub to: u32,

    /// Empty the seed's table before re-running it
    #[arg(long, value_enum, default_value = "none")]
    pub truncate: TruncateArg,

    /// Re-run without rewriting the ledger
    #[arg(long)]
    pub no_backup: bool,

    /// Also re-run the seeds it invokes
    #[arg(long)]
    pub cascade: bool,
}

/// Truncation before a seed is re-run
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncateArg {
    /// Keep existing rows
    None,
    /// Truncate the table
    Direct,
    /// Copy the rows aside, then truncate
    Safe,
}

/// Arguments for seed restore-table
#[derive(Args, Debug)]
pub struct RestoreTableArgs {
    /// Table to restore
    pub table: String,
}

/// Unit context selector
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextArg {
    Migrations,
    Seeds,
}

/// Arguments for the clear-lock command
#[derive(Args, Debug)]
pub struct ClearLockArgs {
    /// Which ledger to clear
    #[arg(value_enum)]
    pub context: ContextArg,

    /// Unit to forget (default: all)
    pub name: Option<String>,
}

/// Arguments for the truncate command
#[derive(Args, Debug)]
pub struct TruncateArgs {
    /// Table to truncate
    pub table: String,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Limit to one context (default: both)
    #[arg(value_enum)]
    pub context: Option<ContextArg>,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
