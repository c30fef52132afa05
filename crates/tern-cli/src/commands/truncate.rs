//! Truncate command implementation

use anyhow::Result;

use crate::cli::{GlobalArgs, OutputFormat, TruncateArgs};
use crate::commands::common::Project;

/// Execute the truncate command
pub(crate) async fn execute(args: &TruncateArgs, global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let engine = project.migration_engine()?;
    engine.truncate(&args.table).await?;

    if global.output == OutputFormat::Json {
        println!("{}", serde_json::json!({ "truncated": args.table }));
    } else {
        println!("Truncated {}", args.table);
    }
    Ok(())
}
