use std::path::Path;

use chrono::Local;
use shiftlog_core::stats::{self, TimeRange};

use crate::commands::common::{format_stats_lines, open_store};
use crate::error::CliError;

pub async fn run_stats(range: TimeRange, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let stats = stats::for_store(&store, range, &Local::now()).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        for line in format_stats_lines(&stats) {
            println!("{line}");
        }
    }
    Ok(())
}
