use std::path::Path;

use chrono::Utc;
use shiftlog_core::live::LiveShiftView;

use crate::commands::common::{format_local_time, open_store};
use crate::error::CliError;

pub async fn run_start(db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let shift = store.start_shift(Utc::now()).await?;
    println!("Shift started at {}", format_local_time(shift.started_at));
    Ok(())
}

pub async fn run_end(db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let now = Utc::now();
    let shift = store.end_shift(now).await?;
    println!(
        "Shift ended at {}, worked {}",
        format_local_time(now),
        LiveShiftView::compute(&shift, now).formatted_time
    );
    Ok(())
}

pub async fn run_break_start(db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let now = Utc::now();
    store.start_break(now).await?;
    println!("Break started at {}", format_local_time(now));
    Ok(())
}

pub async fn run_break_end(db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let now = Utc::now();
    store.end_break(now).await?;
    println!("Break ended at {}", format_local_time(now));
    Ok(())
}
