//! Rollback command implementation

use anyhow::Result;
use tern_engine::RollbackOptions;

use crate::cli::{GlobalArgs, RollbackArgs};
use crate::commands::common::{self, Project};

/// Execute the migration rollback command
pub(crate) async fn execute(args: &RollbackArgs, global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let engine = project.migration_engine()?;

    let options = RollbackOptions {
        no_backup: args.no_backup,
        cascade: args.cascade,
        ..RollbackOptions::default()
    };
    let summary = common::with_spinner(
        global,
        &format!("Rolling {} back to version {}", args.name, args.to),
        engine.rollback_one(&args.name, args.to, options),
    )
    .await?;

    common::print_summary(&summary, global)?;
    common::finish(&summary)
}
