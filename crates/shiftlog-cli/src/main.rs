//! shiftlog CLI - track shifts and breaks from the terminal
//!
//! Every command works against the local database; `sync`, `pull` and
//! `wipe --remote` talk to the sync server.

mod cli;
mod commands;
mod error;


use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crate::cli::{AccountCommands, BreakCommands, Cli, Commands};
use crate::commands::account::{run_account_set, run_account_show};
use crate::commands::common::resolve_db_path;
use crate::commands::completions::run_completions;
use crate::commands::list::run_list;
use crate::commands::shift::{run_break_end, run_break_start, run_end, run_start};
use crate::commands::stats::run_stats;
use crate::commands::status::{run_status, run_watch};
use crate::commands::sync::{run_pull, run_sync};
use crate::commands::wipe::run_wipe;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shiftlog=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let api_url = cli.api_url.as_deref();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    if let Commands::Completions { shell, output } = &command {
        return run_completions(*shell, output.as_deref());
    }

    let db_path = resolve_db_path(cli.db_path)?;
    match command {
        Commands::Start => run_start(&db_path).await?,
        Commands::End => run_end(&db_path).await?,
        Commands::Break { command } => match command {
            BreakCommands::Start => run_break_start(&db_path).await?,
            BreakCommands::End => run_break_end(&db_path).await?,
        },
        Commands::Status { json } => run_status(json, &db_path).await?,
        Commands::Watch { interval } => run_watch(interval, &db_path).await?,
        Commands::List { limit, json } => run_list(limit, json, &db_path).await?,
        Commands::Stats { range, json } => run_stats(range.into(), json, &db_path).await?,
        Commands::Account { command } => match command {
            AccountCommands::Set { email } => run_account_set(&email, api_url, &db_path).await?,
            AccountCommands::Show { json } => run_account_show(json, &db_path).await?,
        },
        Commands::Sync => run_sync(api_url, &db_path).await?,
        Commands::Pull => run_pull(api_url, &db_path).await?,
        Commands::Wipe { remote } => run_wipe(remote, api_url, &db_path).await?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}
