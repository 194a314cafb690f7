use chrono::{
    DateTime, Days, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;

use crate::config::ShiftConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Local calendar date on which the shift starts
    pub start_date: NaiveDate,
}

/// Map a wall-clock time to an instant. Ambiguous times take the earlier
/// reading; times skipped by a forward DST jump are read with the offset in
/// force before the jump, landing as far past the gap as they were into it.
fn resolve_local(tz: Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => {
            let before = tz.offset_from_utc_datetime(&(naive - Duration::days(1))).fix();
            Utc.from_utc_datetime(&(naive - Duration::seconds(i64::from(before.local_minus_utc()))))
        }
    }
}

fn previous_day(date: NaiveDate) -> NaiveDate {
    date.checked_sub_days(Days::new(1)).unwrap_or(date)
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}

/// The most recent shift whose end is at or before `now`.
pub fn latest_completed_shift(shift: &ShiftConfig, now: DateTime<Utc>) -> ShiftWindow {
    let tz = shift.timezone;
    let today = now.with_timezone(&tz).date_naive();

    let mut end_date = today;
    let mut end = resolve_local(tz, end_date.and_time(shift.end));
    if end > now {
        end_date = previous_day(today);
        end = resolve_local(tz, end_date.and_time(shift.end));
    }

    // An end at or before the start means the shift runs across midnight.
    let start_date = if shift.start >= shift.end {
        previous_day(end_date)
    } else {
        end_date
    };
    let start = resolve_local(tz, start_date.and_time(shift.start));

    ShiftWindow {
        start,
        end,
        start_date,
    }
}

/// Next instant strictly after `now` at which the wall clock in `tz` reads `at`.
pub fn next_run_after(tz: Tz, at: NaiveTime, now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.with_timezone(&tz).date_naive();
    let candidate = resolve_local(tz, today.and_time(at));
    if candidate > now {
        candidate
    } else {
        resolve_local(tz, next_day(today).and_time(at))
    }
}

/// `[start, end)` of the local calendar day containing `instant`.
pub fn local_day_bounds(tz: Tz, instant: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let day = instant.with_timezone(&tz).date_naive();
    let start = resolve_local(tz, day.and_time(NaiveTime::default()));
    let end = resolve_local(tz, next_day(day).and_time(NaiveTime::default()));
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift(start: &str, end: &str, tz: Tz) -> ShiftConfig {
        ShiftConfig {
            start: NaiveTime::parse_from_str(start, "%H:%M").unwrap(),
            end: NaiveTime::parse_from_str(end, "%H:%M").unwrap(),
            timezone: tz,
            reconcile_at: NaiveTime::from_hms_opt(5, 35, 0).unwrap(),
            reconcile_enabled: true,
        }
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn overnight_shift_ends_this_morning() {
        let w = latest_completed_shift(&shift("17:00", "05:30", Tz::UTC), utc("2026-03-10T05:35:00Z"));
        assert_eq!(w.start, utc("2026-03-09T17:00:00Z"));
        assert_eq!(w.end, utc("2026-03-10T05:30:00Z"));
        assert_eq!(w.start_date, NaiveDate::from_ymd_opt(2026, 3, 9).unwrap());
    }

    #[test]
    fn unfinished_shift_falls_back_a_day() {
        let w = latest_completed_shift(&shift("09:00", "17:00", Tz::UTC), utc("2026-03-10T12:00:00Z"));
        assert_eq!(w.start, utc("2026-03-09T09:00:00Z"));
        assert_eq!(w.end, utc("2026-03-09T17:00:00Z"));
    }

    #[test]
    fn window_respects_timezone() {
        let w = latest_completed_shift(
            &shift("09:00", "17:00", chrono_tz::Asia::Karachi),
            utc("2026-03-10T13:00:00Z"),
        );
        // 18:00 in Karachi (UTC+5), so today's shift is complete.
        assert_eq!(w.start, utc("2026-03-10T04:00:00Z"));
        assert_eq!(w.end, utc("2026-03-10T12:00:00Z"));
    }

    #[test]
    fn next_run_rolls_to_tomorrow_once_passed() {
        let at = NaiveTime::from_hms_opt(5, 35, 0).unwrap();
        assert_eq!(
            next_run_after(Tz::UTC, at, utc("2026-03-10T05:00:00Z")),
            utc("2026-03-10T05:35:00Z")
        );
        assert_eq!(
            next_run_after(Tz::UTC, at, utc("2026-03-10T05:35:00Z")),
            utc("2026-03-11T05:35:00Z")
        );
    }

    #[test]
    fn shift_end_inside_spring_forward_gap() {
        // 2026-03-08 02:00 EST jumps to 03:00 EDT, so 02:30 never shows on the wall clock.
        let w = latest_completed_shift(
            &shift("17:00", "02:30", chrono_tz::America::New_York),
            utc("2026-03-08T10:00:00Z"),
        );
        assert_eq!(w.start, utc("2026-03-07T22:00:00Z"));
        assert_eq!(w.end, utc("2026-03-08T07:30:00Z"));
        assert_eq!(w.start_date, NaiveDate::from_ymd_opt(2026, 3, 7).unwrap());
        assert!(w.end > w.start);
    }

    #[test]
    fn run_time_inside_gap_lands_after_it() {
        let at = NaiveTime::from_hms_opt(2, 30, 0).unwrap();
        let next = next_run_after(chrono_tz::America::New_York, at, utc("2026-03-08T05:00:00Z"));
        assert_eq!(next, utc("2026-03-08T07:30:00Z"));
    }

    #[test]
    fn fall_back_overlap_takes_first_reading() {
        // 2026-11-01 01:30 happens twice in New York; the EDT reading comes first.
        let at = NaiveTime::from_hms_opt(1, 30, 0).unwrap();
        let next = next_run_after(chrono_tz::America::New_York, at, utc("2026-11-01T04:00:00Z"));
        assert_eq!(next, utc("2026-11-01T05:30:00Z"));
    }

    #[test]
    fn day_bounds_follow_local_midnight() {
        let (start, end) = local_day_bounds(chrono_tz::Asia::Karachi, utc("2026-03-10T20:00:00Z"));
        assert_eq!(start, utc("2026-03-10T19:00:00Z"));
        assert_eq!(end, utc("2026-03-11T19:00:00Z"));
    }
}
