//! Clear-lock command implementation

use anyhow::Result;

use crate::cli::{ClearLockArgs, ContextArg, GlobalArgs, OutputFormat};
use crate::commands::common::Project;

/// Execute the clear-lock command
pub(crate) async fn execute(args: &ClearLockArgs, global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let name = args.name.as_deref();
    let removed = match args.context {
        ContextArg::Migrations => project.migration_engine()?.clear_lock(name)?,
        ContextArg::Seeds => project.seed_engine()?.clear_lock(name)?,
    };

    if global.output == OutputFormat::Json {
        println!("{}", serde_json::json!({ "removed": removed }));
    } else {
        match name {
            Some(name) => println!("Cleared lock entry for {}", name),
            None => println!("Cleared {} lock entries", removed),
        }
    }
    Ok(())
}
