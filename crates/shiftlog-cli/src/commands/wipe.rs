use std::path::Path;

use crate::commands::common::{open_store, sync_engine};
use crate::error::CliError;

pub async fn run_wipe(remote: bool, api_url: Option<&str>, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;

    if remote {
        let report = sync_engine(store, api_url)?.wipe_remote_and_local().await?;
        println!(
            "Deleted {} local and {} remote shifts",
            report.local, report.remote
        );
    } else {
        let removed = store.wipe().await?;
        println!("Deleted {removed} local shifts");
    }
    Ok(())
}
