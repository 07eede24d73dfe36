use std::path::Path;

use chrono::Utc;
use shiftlog_core::sync::{HttpSyncClient, SyncEngine};

use crate::commands::common::{client_config, format_account_line, open_store};
use crate::error::CliError;

/// Set the account email. A changed email pulls that account's history when a
/// sync server is configured.
pub async fn run_account_set(
    email: &str,
    api_url: Option<&str>,
    db_path: &Path,
) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let config = client_config(api_url)?;
    let (account, changed) = store.set_account_email(email).await?;
    println!("Account set to {}", account.email);

    if !changed {
        return Ok(());
    }
    if config.api_url.is_none() {
        println!("No sync server configured; run `shiftlog pull --api-url <URL>` later.");
        return Ok(());
    }

    let engine = SyncEngine::new(store, HttpSyncClient::from_config(&config)?);
    match engine.pull().await {
        Ok(report) => println!(
            "Pulled {} new and {} updated shifts",
            report.inserted, report.updated
        ),
        Err(e) => {
            tracing::warn!("Initial pull failed: {e}");
            eprintln!("Could not pull remote history: {e}");
        }
    }
    Ok(())
}

pub async fn run_account_show(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let account = store.account().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&account)?);
        return Ok(());
    }

    match account {
        Some(account) => println!("{}", format_account_line(&account, Utc::now())),
        None => println!("No account configured."),
    }
    Ok(())
}
