use std::path::Path;

use chrono::Utc;
use shiftlog_core::live::LiveShiftView;

use crate::commands::common::{format_shift_line, open_store};
use crate::error::CliError;

pub async fn run_list(limit: usize, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let now = Utc::now();
    let views = store
        .list_shifts(limit, 0)
        .await?
        .iter()
        .map(|shift| LiveShiftView::compute(shift, now))
        .collect::<Vec<_>>();

    if as_json {
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    if views.is_empty() {
        println!("No shifts recorded.");
        return Ok(());
    }

    for view in &views {
        println!("{}", format_shift_line(view));
    }
    Ok(())
}
