//! tern CLI - versioned migrations and seeds with a lock ledger

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::Cli;
use commands::common::ExitCode;
use commands::{alter, clear_lock, drop, migrate, rollback, seed, status, truncate};
use tern_engine::EngineError;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env = env_logger::Env::default().default_filter_or(default_level);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}

async fn dispatch(cli: &Cli) -> Result<()> {
    match &cli.command {
        cli::Commands::Migrate(args) => migrate::execute(args, &cli.global).await,
        cli::Commands::Drop(args) => drop::execute(args, &cli.global).await,
        cli::Commands::Alter(args) => alter::execute(args, &cli.global).await,
        cli::Commands::Rollback(args) => rollback::execute(args, &cli.global).await,
        cli::Commands::Seed(args) => seed::execute(args, &cli.global).await,
        cli::Commands::ClearLock(args) => clear_lock::execute(args, &cli.global).await,
        cli::Commands::Truncate(args) => truncate::execute(args, &cli.global).await,
        cli::Commands::Status(args) => status::execute(args, &cli.global).await,
    }
}

/// Process exit status for a command error
fn exit_status(err: &anyhow::Error) -> i32 {
    if let Some(code) = err.downcast_ref::<ExitCode>() {
        return code.0;
    }
    match err.downcast_ref::<EngineError>() {
        Some(engine_err) => engine_err.exit_code(),
        None => 1,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    if let Err(err) = dispatch(&cli).await {
        if err.downcast_ref::<ExitCode>().is_none() {
            eprintln!("Error: {:#}", err);
        }
        std::process::exit(exit_status(&err));
    }
}
