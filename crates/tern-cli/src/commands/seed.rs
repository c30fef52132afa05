//! Seed command implementation

use anyhow::Result;
use tern_engine::{RollbackOptions, TruncateMode};

use crate::cli::{
    GlobalArgs, OutputFormat, RestoreTableArgs, SeedArgs, SeedCommands, SeedRollbackArgs,
    SeedRunArgs, TruncateArg,
};
use crate::commands::common::{self, Project};

/// Execute the seed command
pub(crate) async fn execute(args: &SeedArgs, global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    match &args.command {
        SeedCommands::Run(run_args) => run(&project, run_args, global).await,
        SeedCommands::Rollback(rollback_args) => rollback(&project, rollback_args, global).await,
        SeedCommands::RestoreTable(restore_args) => {
            restore_table(&project, restore_args, global).await
        }
    }
}

async fn run(project: &Project, args: &SeedRunArgs, global: &GlobalArgs) -> Result<()> {
    let engine = project.seed_engine()?;
    let summary = match &args.name {
        Some(name) => {
            common::with_spinner(global, &format!("Seeding {}", name), async {
                engine.run_one(name, args.invoke).await
            })
            .await?
        }
        None => {
            common::with_spinner(global, "Running seeds", async {
                engine.run_all(args.invoke).await
            })
            .await?
        }
    };

    common::print_summary(&summary, global)?;
    common::finish(&summary)
}

fn truncate_mode(arg: TruncateArg) -> TruncateMode {
    match arg {
        TruncateArg::None => TruncateMode::None,
        TruncateArg::Direct => TruncateMode::Direct,
        TruncateArg::Safe => TruncateMode::Safe,
    }
}

async fn rollback(project: &Project, args: &SeedRollbackArgs, global: &GlobalArgs) -> Result<()> {
    let engine = project.seed_engine()?;
    let options = RollbackOptions {
        no_backup: args.no_backup,
        cascade: args.cascade,
        truncate: truncate_mode(args.truncate),
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

async fn restore_table(
    project: &Project,
    args: &RestoreTableArgs,
    global: &GlobalArgs,
) -> Result<()> {
    let engine = project.seed_engine()?;
    let rows = engine.restore_table(&args.table).await?;

    if global.output == OutputFormat::Json {
        println!(
            "{}",
            serde_json::json!({ "table": args.table, "rows": rows })
        );
    } else {
        println!("  ✓ {} ({} rows restored)", args.table, rows);
    }
    Ok(())
}
