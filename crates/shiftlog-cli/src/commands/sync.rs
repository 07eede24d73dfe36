use std::path::Path;

use crate::commands::common::{open_store, sync_engine};
use crate::error::CliError;

pub async fn run_sync(api_url: Option<&str>, db_path: &Path) -> Result<(), CliError> {
    let engine = sync_engine(open_store(db_path).await?, api_url)?;
    let ack = engine.sync().await?;
    println!(
        "{} ({} new, {} updated, {} unchanged)",
        ack.message, ack.inserted, ack.updated, ack.discarded
    );
    Ok(())
}

pub async fn run_pull(api_url: Option<&str>, db_path: &Path) -> Result<(), CliError> {
    let engine = sync_engine(open_store(db_path).await?, api_url)?;
    let report = engine.pull().await?;
    println!(
        "Pulled {} new and {} updated shifts ({} unchanged)",
        report.inserted, report.updated, report.discarded
    );
    Ok(())
}
