//! Aggregated shift statistics over a calendar window.
//!
//! The window runs from local midnight at the start of the current week
//! (Monday), month or year up to `now`. A shift belongs to the window when it
//! started at or after the window start; its whole duration counts, even if it
//! began on the last evening of the window and is still running.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Shift;
use crate::services::LocalStore;
use crate::util::serialize_millis;
use crate::Result;

/// Calendar window for statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeRange {
    #[default]
    Week,
    Month,
    Year,
}

/// Worked time for one local calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayTotal {
    pub date: NaiveDate,
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,
}

/// Result of [`project`]. Durations serialize as milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftStats {
    pub time_range: TimeRange,
    pub start_of_time_range: DateTime<Utc>,
    pub end_of_time_range: DateTime<Utc>,
    /// Ascending by day
    pub chart_data: Vec<DayTotal>,
    pub total_shifts: usize,
    /// Wall-clock span, breaks not subtracted
    #[serde(serialize_with = "serialize_millis")]
    pub total_duration: Duration,
}

/// Local midnight opening the window that contains `now`
pub fn window_start<Tz: TimeZone>(range: TimeRange, now: &DateTime<Tz>) -> DateTime<Tz> {
    let today = now.date_naive();
    let first_day = match range {
        TimeRange::Week => today - Days::new(u64::from(today.weekday().num_days_from_monday())),
        TimeRange::Month => today - Days::new(u64::from(today.day0())),
        TimeRange::Year => today - Days::new(u64::from(today.ordinal0())),
    };
    local_midnight(&now.timezone(), first_day)
}

/// Start of `date` in `tz`, skipping forward past a DST gap at midnight
fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Tz> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..24)
        .find_map(|hour| {
            tz.from_local_datetime(&(midnight + Duration::hours(hour)))
                .earliest()
        })
        .unwrap_or_else(|| tz.from_utc_datetime(&midnight))
}

/// Project shifts onto the window for `range` ending at `now`.
///
/// Shifts outside the window are ignored, so callers may pass the whole log.
pub fn project<Tz: TimeZone>(shifts: &[Shift], range: TimeRange, now: &DateTime<Tz>) -> ShiftStats {
    let tz = now.timezone();
    let start = window_start(range, now).with_timezone(&Utc);
    let end = now.with_timezone(&Utc);

    let mut per_day: BTreeMap<NaiveDate, Duration> = BTreeMap::new();
    let mut total_shifts = 0;
    let mut total_duration = Duration::zero();

    for shift in shifts.iter().filter(|shift| shift.started_at >= start) {
        let duration = shift.elapsed(end);
        let day = shift.started_at.with_timezone(&tz).date_naive();
        *per_day.entry(day).or_insert_with(Duration::zero) += duration;
        total_shifts += 1;
        total_duration += duration;
    }

    ShiftStats {
        time_range: range,
        start_of_time_range: start,
        end_of_time_range: end,
        chart_data: per_day
            .into_iter()
            .map(|(date, duration)| DayTotal { date, duration })
            .collect(),
        total_shifts,
        total_duration,
    }
}

/// Load the window's shifts from the local store and project them.
pub async fn for_store<Tz: TimeZone>(
    store: &LocalStore,
    range: TimeRange,
    now: &DateTime<Tz>,
) -> Result<ShiftStats> {
    let since = window_start(range, now).with_timezone(&Utc);
    let shifts = store.shifts_started_since(since).await?;
    Ok(project(&shifts, range, now))
}
