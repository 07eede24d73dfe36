use std::env;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use shiftlog_core::config::ClientConfig;
use shiftlog_core::live::{format_duration, LiveShiftView};
use shiftlog_core::services::LocalStore;
use shiftlog_core::stats::{ShiftStats, TimeRange};
use shiftlog_core::sync::{HttpSyncClient, SyncEngine};
use shiftlog_core::Account;

use crate::error::CliError;

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    cli_db_path
        .or_else(|| env::var_os("SHIFTLOG_DB_PATH").map(PathBuf::from))
        .or_else(default_db_path)
        .ok_or(CliError::NoDataDir)
}

pub fn default_db_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("shiftlog").join("shiftlog.db"))
}

pub async fn open_store(path: &Path) -> Result<LocalStore, CliError> {
    Ok(LocalStore::open_path(path).await?)
}

pub fn client_config(api_url: Option<&str>) -> Result<ClientConfig, CliError> {
    let config = ClientConfig::from_env()?;
    match api_url {
        Some(url) => Ok(config.with_api_url(url)?),
        None => Ok(config),
    }
}

pub fn sync_engine(
    store: LocalStore,
    api_url: Option<&str>,
) -> Result<SyncEngine<HttpSyncClient>, CliError> {
    let client = HttpSyncClient::from_config(&client_config(api_url)?)?;
    Ok(SyncEngine::new(store, client))
}

pub fn format_local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

pub fn short_id(view: &LiveShiftView) -> String {
    view.shift.id.to_string().chars().take(13).collect()
}

pub fn format_shift_line(view: &LiveShiftView) -> String {
    let started = format_local_time(view.shift.started_at);
    let ended = view
        .shift
        .ended_at
        .ended_at()
        .map_or_else(|| "ongoing".to_string(), format_local_time);

    format!(
        "{:<13}  {started}  {ended:<16}  worked {:<12}  breaks {}",
        short_id(view),
        view.formatted_time,
        view.formatted_break_time
    )
}

pub fn format_status_lines(view: &LiveShiftView) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Shift {} started {}",
            short_id(view),
            format_local_time(view.shift.started_at)
        ),
        format!("Worked:  {}", view.formatted_time),
        format!(
            "Breaks:  {} ({:.1}%)",
            view.formatted_break_time, view.break_percentage
        ),
    ];
    if view.ongoing_break {
        lines.push("On break".to_string());
    }
    lines
}

pub fn format_stats_lines(stats: &ShiftStats) -> Vec<String> {
    let label = match stats.time_range {
        TimeRange::Week => "Weekly",
        TimeRange::Month => "Monthly",
        TimeRange::Year => "Yearly",
    };

    let mut lines = vec![format!(
        "{label} report {} - {}",
        stats.start_of_time_range.with_timezone(&Local).format("%b %-d"),
        stats.end_of_time_range.with_timezone(&Local).format("%b %-d")
    )];
    lines.extend(stats.chart_data.iter().map(|day| {
        format!(
            "{}  {}",
            day.date.format("%a %Y-%m-%d"),
            format_duration(day.duration)
        )
    }));
    lines.push(format!(
        "{} shifts, {} total",
        stats.total_shifts,
        format_duration(stats.total_duration)
    ));
    lines
}

pub fn format_account_line(account: &Account, now: DateTime<Utc>) -> String {
    let synced = account.synced_at.map_or_else(
        || "never synced".to_string(),
        |at| format!("synced {}", format_relative_time(at, now)),
    );
    format!("{} ({synced})", account.email)
}

pub fn format_relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = (now - at).num_milliseconds().max(0);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
