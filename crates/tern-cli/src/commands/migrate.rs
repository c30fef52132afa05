//! Migrate command implementation

use anyhow::Result;

use crate::cli::{GlobalArgs, MigrateArgs};
use crate::commands::common::{self, Project};

/// Execute the migrate command
pub(crate) async fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let engine = project.migration_engine()?;

    let summary = match &args.name {
        Some(name) => {
            common::with_spinner(global, &format!("Applying {}", name), async {
                engine.apply_one(name, args.cascade).await
            })
            .await?
        }
        None => {
            common::with_spinner(global, "Applying migrations", async {
                engine.apply_all(args.cascade).await
            })
            .await?
        }
    };

    common::print_summary(&summary, global)?;
    common::finish(&summary)
}
