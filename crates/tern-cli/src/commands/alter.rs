//! Alter command implementation

use anyhow::Result;
use tern_engine::AlterRequest;

use crate::cli::{AlterArgs, GlobalArgs};
use crate::commands::common::{self, Project};

/// Execute the alter command
pub(crate) async fn execute(args: &AlterArgs, global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let engine = project.migration_engine()?;

    let request = AlterRequest {
        drop_extra_columns: args.drop_columns,
        dry_run: args.dry_run,
    };
    let report = engine.alter_one(&args.name, request).await?;
    common::print_report(&report, global)
}
