//! Drop command implementation

use anyhow::Result;
use tern_engine::RunSummary;

use crate::cli::{DropArgs, GlobalArgs};
use crate::commands::common::{self, Project};

/// Execute the drop command
pub(crate) async fn execute(args: &DropArgs, global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let engine = project.migration_engine()?;

    let summary = match &args.name {
        Some(name) => {
            let report = engine.drop_one(name).await?;
            let mut summary = RunSummary::new();
            summary.push(report);
            summary
        }
        None => {
            common::with_spinner(global, "Dropping migrations", engine.drop_all()).await?
        }
    };

    common::print_summary(&summary, global)?;
    common::finish(&summary)
}
