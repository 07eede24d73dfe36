//! Live per-shift figures shown by `status`, `watch` and the shift list.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::Shift;
use crate::util::serialize_millis;

/// Derived timings for one shift at a given instant
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveShiftView {
    pub shift: Shift,
    pub ongoing_break: bool,
    #[serde(serialize_with = "serialize_millis")]
    pub total_elapsed: Duration,
    #[serde(serialize_with = "serialize_millis")]
    pub total_break: Duration,
    #[serde(serialize_with = "serialize_millis")]
    pub working_time_without_breaks: Duration,
    /// Share of elapsed time spent on breaks, 0 when nothing has elapsed
    pub break_percentage: f64,
    /// `working_time_without_breaks`, formatted
    pub formatted_time: String,
    /// `total_break`, formatted
    pub formatted_break_time: String,
}

impl LiveShiftView {
    pub fn compute(shift: &Shift, now: DateTime<Utc>) -> Self {
        let total_elapsed = shift.elapsed(now);
        let total_break = shift.total_break(now);
        let working_time_without_breaks = total_elapsed - total_break;

        Self {
            shift: shift.clone(),
            ongoing_break: shift.has_ongoing_break(),
            total_elapsed,
            total_break,
            working_time_without_breaks,
            break_percentage: percentage(total_break, total_elapsed),
            formatted_time: format_duration(working_time_without_breaks),
            formatted_break_time: format_duration(total_break),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn percentage(part: Duration, whole: Duration) -> f64 {
    let whole = whole.num_milliseconds();
    if whole <= 0 {
        return 0.0;
    }
    part.num_milliseconds() as f64 / whole as f64 * 100.0
}

/// Format as `"1h 2m 3s"`; negative spans render as zero.
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.num_seconds().max(0);
    format!(
        "{}h {}m {}s",
        seconds / 3600,
        seconds % 3600 / 60,
        seconds % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn t(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 2, 8, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    #[test]
    fn format_duration_matches_display_format() {
        assert_eq!(format_duration(Duration::seconds(3723)), "1h 2m 3s");
        assert_eq!(format_duration(Duration::zero()), "0h 0m 0s");
        assert_eq!(format_duration(Duration::hours(27)), "27h 0m 0s");
        assert_eq!(format_duration(Duration::seconds(-5)), "0h 0m 0s");
    }

    #[test]
    fn view_subtracts_breaks_from_working_time() {
        let shift = Shift::start(t(0))
            .start_break(t(60))
            .and_then(|s| s.end_break(t(90)))
            .unwrap();

        let view = LiveShiftView::compute(&shift, t(120));

        assert!(!view.ongoing_break);
        assert_eq!(view.total_elapsed, Duration::minutes(120));
        assert_eq!(view.total_break, Duration::minutes(30));
        assert_eq!(view.working_time_without_breaks, Duration::minutes(90));
        assert!((view.break_percentage - 25.0).abs() < f64::EPSILON);
        assert_eq!(view.formatted_time, "1h 30m 0s");
        assert_eq!(view.formatted_break_time, "0h 30m 0s");
    }

    #[test]
    fn ongoing_break_counts_up_to_now() {
        let shift = Shift::start(t(0)).start_break(t(30)).unwrap();

        let view = LiveShiftView::compute(&shift, t(40));

        assert!(view.ongoing_break);
        assert_eq!(view.total_break, Duration::minutes(10));
    }

    #[test]
    fn zero_elapsed_has_zero_break_percentage() {
        let shift = Shift::start(t(0));
        let view = LiveShiftView::compute(&shift, t(0));
        assert!(view.break_percentage.abs() < f64::EPSILON);
        assert!(!view.break_percentage.is_nan());
    }

    #[test]
    fn ended_shift_ignores_now() {
        let shift = Shift::start(t(0)).end(t(60)).unwrap();
        let view = LiveShiftView::compute(&shift, t(600));
        assert_eq!(view.total_elapsed, Duration::minutes(60));
    }
}
