use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use shiftlog_core::live::LiveShiftView;
use shiftlog_core::watch::CurrentShiftWatcher;

use crate::commands::common::{format_status_lines, open_store};
use crate::error::CliError;

pub async fn run_status(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let view = store
        .current_shift()
        .await?
        .map(|shift| LiveShiftView::compute(&shift, Utc::now()));

    if as_json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    match view {
        Some(view) => {
            for line in format_status_lines(&view) {
                println!("{line}");
            }
        }
        None => println!("No shift in progress."),
    }
    Ok(())
}

pub async fn run_watch(interval_secs: u64, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let watcher = CurrentShiftWatcher::spawn(store, Duration::from_secs(interval_secs));
    let mut receiver = watcher.subscribe();
    let mut stdout = io::stdout();

    loop {
        let lines = receiver
            .borrow_and_update()
            .as_ref()
            .map_or_else(|| vec!["No shift in progress.".to_string()], format_status_lines);
        // Clear screen and move the cursor home before redrawing.
        write!(stdout, "\x1b[2J\x1b[H")?;
        for line in lines {
            writeln!(stdout, "{line}")?;
        }
        stdout.flush()?;

        tokio::select! {
            changed = receiver.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
        }
    }

    Ok(())
}
