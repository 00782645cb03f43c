use crate::model::error::Error;
use crate::model::error::schedule::ScheduleError;
use crate::model::schedule::backup_schedule::*;
use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};

// Monthly with clamping always matches within two months.
const DATE_SEARCH_HORIZON: u64 = 62;
// Two days of hours cover every hour of day, even across a skipped DST hour.
const WINDOW_SEARCH_HOURS: i64 = 48;

/// Pure next-trigger computation for recurring schedules.
///
/// Wall-clock rules are evaluated in the given time zone, so a daily 09:00
/// schedule stays at 09:00 across daylight-saving changes even though the
/// elapsed interval is then 23 or 25 hours.
pub struct ScheduleEngine;

impl ScheduleEngine {
    pub fn validate(schedule: &BackupSchedule) -> Result<(), Error> {
        match schedule.interval {
            IntervalKind::Weekly if schedule.weekdays.is_empty() => {
                Err(Self::invalid("weekdays", "[]"))?
            }
            IntervalKind::Monthly => {
                if schedule.month_days.is_empty() {
                    Err(Self::invalid("month_days", "[]"))?
                }
                if let Some(day) = schedule
                    .month_days
                    .iter()
                    .find(|day| !(1..=31).contains(*day))
                {
                    Err(Self::invalid("month_days", day))?
                }
            }
            IntervalKind::CustomHours(0) => Err(Self::invalid("interval", "CustomHours(0)"))?,
            _ => {}
        }

        if let Some(window) = schedule.time_window {
            if window.start >= 24 {
                Err(Self::invalid("time_window.start", window.start))?
            }
            if window.end >= 24 {
                Err(Self::invalid("time_window.end", window.end))?
            }
            if window.start == window.end {
                Err(Self::invalid(
                    "time_window",
                    format!("{}-{}", window.start, window.end),
                ))?
            }
            if !Self::window_reachable(schedule, &window) {
                Err(Self::invalid(
                    "time_window",
                    format!("{}-{}", window.start, window.end),
                ))?
            }
        }

        Ok(())
    }

    /// First trigger strictly after `after`. `None` only when no occurrence
    /// satisfies the rules within the search horizon, which validated
    /// schedules never hit.
    pub fn next_run_time<T: TimeZone>(
        schedule: &BackupSchedule,
        after: DateTime<Utc>,
        time_zone: &T,
    ) -> Option<DateTime<Utc>> {
        match schedule.interval {
            IntervalKind::CustomHours(hours) => {
                Self::next_custom_run(schedule, hours, after, time_zone)
            }
            _ => Self::next_calendar_run(schedule, after, time_zone),
        }
    }

    fn next_calendar_run<T: TimeZone>(
        schedule: &BackupSchedule,
        after: DateTime<Utc>,
        time_zone: &T,
    ) -> Option<DateTime<Utc>> {
        let first_date = after.with_timezone(time_zone).date_naive();
        (0..=DATE_SEARCH_HORIZON)
            .map_while(|offset| first_date.checked_add_days(Days::new(offset)))
            .filter(|date| Self::matches_date(schedule, *date))
            .map(|date| Self::resolve_local(time_zone, date.and_time(schedule.time_of_day)))
            .find(|candidate| {
                *candidate > after && Self::within_window(schedule, *candidate, time_zone)
            })
    }

    /// Steps `n` hours from `after`, or waits for the day's anchor. A step that
    /// lands outside the window moves forward hour by hour to the next
    /// in-window hour, keeping its minute.
    fn next_custom_run<T: TimeZone>(
        schedule: &BackupSchedule,
        hours: u32,
        after: DateTime<Utc>,
        time_zone: &T,
    ) -> Option<DateTime<Utc>> {
        let step = Duration::hours(i64::from(hours.max(1)));
        let date = after.with_timezone(time_zone).date_naive();
        let anchor = Self::resolve_local(time_zone, date.and_time(schedule.time_of_day));

        let candidate = if after < anchor { anchor } else { after + step };
        (0..=WINDOW_SEARCH_HOURS)
            .map(|hour| candidate + Duration::hours(hour))
            .find(|instant| Self::within_window(schedule, *instant, time_zone))
    }

    fn matches_date(schedule: &BackupSchedule, date: NaiveDate) -> bool {
        match schedule.interval {
            IntervalKind::Daily | IntervalKind::CustomHours(_) => true,
            IntervalKind::Weekly => schedule.weekdays.contains(&date.weekday()),
            IntervalKind::Monthly => {
                let day = date.day();
                schedule.month_days.contains(&day)
                    || (Self::is_last_day_of_month(date)
                        && schedule.month_days.iter().any(|requested| *requested > day))
            }
        }
    }

    fn is_last_day_of_month(date: NaiveDate) -> bool {
        date.succ_opt()
            .is_none_or(|next| next.month() != date.month())
    }

    fn within_window<T: TimeZone>(
        schedule: &BackupSchedule,
        instant: DateTime<Utc>,
        time_zone: &T,
    ) -> bool {
        schedule.time_window.is_none_or(|window| {
            window.contains_hour(instant.with_timezone(time_zone).hour())
        })
    }

    fn window_reachable(schedule: &BackupSchedule, window: &TimeWindow) -> bool {
        let anchor = u64::from(schedule.time_of_day.hour());
        match schedule.interval {
            IntervalKind::CustomHours(hours) => (0..24u64).any(|step| {
                let hour = (anchor + step * u64::from(hours)) % 24;
                window.contains_hour(hour as u32)
            }),
            _ => window.contains_hour(anchor as u32),
        }
    }

    /// Maps a wall-clock time to an instant. Times skipped by a forward
    /// transition move one hour later; repeated times take the earlier instant.
    fn resolve_local<T: TimeZone>(time_zone: &T, local: NaiveDateTime) -> DateTime<Utc> {
        time_zone
            .from_local_datetime(&local)
            .earliest()
            .or_else(|| {
                time_zone
                    .from_local_datetime(&(local + Duration::hours(1)))
                    .earliest()
            })
            .map(|instant| instant.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&local))
    }

    fn invalid(field: &str, value: impl ToString) -> ScheduleError {
        ScheduleError::invalid_schedule_definition(field, value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::error::Error;
    use crate::model::job::backup_job::SourceDescriptor;
    use chrono::{NaiveTime, Weekday};
    use chrono_tz::Europe::Berlin;

    fn at(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn utc(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc)
    }

    fn schedule(interval: IntervalKind, time_of_day: NaiveTime) -> BackupSchedule {
        BackupSchedule::new(
            "nightly",
            interval,
            time_of_day,
            SourceDescriptor::new("repo", vec!["/home".into()]),
        )
    }

    fn invalid_field(result: Result<(), Error>) -> String {
        match result {
            Err(Error::Schedule(ScheduleError::InvalidScheduleDefinition { field, .. })) => field,
            other => panic!("expected invalid schedule, got {other:?}"),
        }
    }

    #[test]
    fn daily_fires_later_the_same_day() {
        let daily = schedule(IntervalKind::Daily, at(15, 30));
        let next = ScheduleEngine::next_run_time(&daily, utc("2025-06-10T14:00:00Z"), &Utc)
            .unwrap();
        assert_eq!(next, utc("2025-06-10T15:30:00Z"));
    }

    #[test]
    fn daily_rolls_to_the_next_day_once_passed() {
        let daily = schedule(IntervalKind::Daily, at(15, 30));
        let next = ScheduleEngine::next_run_time(&daily, utc("2025-06-10T16:00:00Z"), &Utc)
            .unwrap();
        assert_eq!(next, utc("2025-06-11T15:30:00Z"));

        let exact = ScheduleEngine::next_run_time(&daily, utc("2025-06-10T15:30:00Z"), &Utc)
            .unwrap();
        assert_eq!(exact, utc("2025-06-11T15:30:00Z"));
    }

    #[test]
    fn weekly_picks_the_nearest_listed_weekday() {
        // 2025-06-10 is a Tuesday.
        let weekly = schedule(IntervalKind::Weekly, at(8, 0))
            .with_weekdays([Weekday::Mon, Weekday::Thu]);
        let next = ScheduleEngine::next_run_time(&weekly, utc("2025-06-10T12:00:00Z"), &Utc)
            .unwrap();
        assert_eq!(next, utc("2025-06-12T08:00:00Z"));

        let same_day = schedule(IntervalKind::Weekly, at(18, 0)).with_weekdays([Weekday::Tue]);
        let next = ScheduleEngine::next_run_time(&same_day, utc("2025-06-10T12:00:00Z"), &Utc)
            .unwrap();
        assert_eq!(next, utc("2025-06-10T18:00:00Z"));

        let next = ScheduleEngine::next_run_time(&same_day, utc("2025-06-10T19:00:00Z"), &Utc)
            .unwrap();
        assert_eq!(next, utc("2025-06-17T18:00:00Z"));
    }

    #[test]
    fn monthly_picks_the_nearest_listed_day() {
        let monthly = schedule(IntervalKind::Monthly, at(3, 0)).with_month_days([1, 15]);
        let next = ScheduleEngine::next_run_time(&monthly, utc("2025-01-20T00:00:00Z"), &Utc)
            .unwrap();
        assert_eq!(next, utc("2025-02-01T03:00:00Z"));

        let next = ScheduleEngine::next_run_time(&monthly, utc("2025-02-01T03:00:00Z"), &Utc)
            .unwrap();
        assert_eq!(next, utc("2025-02-15T03:00:00Z"));
    }

    #[test]
    fn monthly_clamps_days_beyond_the_month_end() {
        let end_of_month = schedule(IntervalKind::Monthly, at(3, 0)).with_month_days([31]);
        let february = ScheduleEngine::next_run_time(&end_of_month, utc("2025-02-10T00:00:00Z"), &Utc)
            .unwrap();
        assert_eq!(february, utc("2025-02-28T03:00:00Z"));

        let leap = ScheduleEngine::next_run_time(&end_of_month, utc("2024-02-10T00:00:00Z"), &Utc)
            .unwrap();
        assert_eq!(leap, utc("2024-02-29T03:00:00Z"));

        let april = ScheduleEngine::next_run_time(&end_of_month, utc("2025-04-01T00:00:00Z"), &Utc)
            .unwrap();
        assert_eq!(april, utc("2025-04-30T03:00:00Z"));

        let march = ScheduleEngine::next_run_time(&end_of_month, utc("2025-03-01T00:00:00Z"), &Utc)
            .unwrap();
        assert_eq!(march, utc("2025-03-31T03:00:00Z"));
    }

    #[test]
    fn monthly_days_clamping_to_the_same_date_fire_once() {
        let late = schedule(IntervalKind::Monthly, at(3, 0)).with_month_days([29, 30, 31]);
        let first = ScheduleEngine::next_run_time(&late, utc("2025-02-01T00:00:00Z"), &Utc)
            .unwrap();
        assert_eq!(first, utc("2025-02-28T03:00:00Z"));

        let second = ScheduleEngine::next_run_time(&late, first, &Utc).unwrap();
        assert_eq!(second, utc("2025-03-29T03:00:00Z"));
    }

    #[test]
    fn custom_hours_waits_for_the_anchor_then_steps() {
        let every_six = schedule(IntervalKind::CustomHours(6), at(8, 0));
        let before = ScheduleEngine::next_run_time(&every_six, utc("2025-06-10T07:00:00Z"), &Utc)
            .unwrap();
        assert_eq!(before, utc("2025-06-10T08:00:00Z"));

        let after = ScheduleEngine::next_run_time(&every_six, utc("2025-06-10T08:00:00Z"), &Utc)
            .unwrap();
        assert_eq!(after, utc("2025-06-10T14:00:00Z"));

        let later = ScheduleEngine::next_run_time(&every_six, utc("2025-06-10T09:15:00Z"), &Utc)
            .unwrap();
        assert_eq!(later, utc("2025-06-10T15:15:00Z"));
    }

    #[test]
    fn custom_hours_skips_steps_outside_the_window() {
        let hourly_at_night = schedule(IntervalKind::CustomHours(1), at(0, 0))
            .with_time_window(TimeWindow::new(22, 6));
        let next =
            ScheduleEngine::next_run_time(&hourly_at_night, utc("2025-06-10T07:00:00Z"), &Utc)
            .unwrap();
        assert_eq!(next, utc("2025-06-10T22:00:00Z"));

        let inside =
            ScheduleEngine::next_run_time(&hourly_at_night, utc("2025-06-10T23:00:00Z"), &Utc)
            .unwrap();
        assert_eq!(inside, utc("2025-06-11T00:00:00Z"));
    }

    #[test]
    fn custom_hours_never_fires_outside_a_narrow_window() {
        // A 24-hour step whose phase drifted past the one-hour window.
        let nightly = schedule(IntervalKind::CustomHours(24), at(22, 0))
            .with_time_window(TimeWindow::new(22, 23));
        assert!(ScheduleEngine::validate(&nightly).is_ok());

        let mut after = utc("2025-06-10T23:10:00Z");
        for _ in 0..60 {
            let next = ScheduleEngine::next_run_time(&nightly, after, &Utc).unwrap();
            assert!(next > after);
            assert_eq!(next.hour(), 22, "fired at {next}");
            after = next;
        }
        assert_eq!(
            ScheduleEngine::next_run_time(&nightly, utc("2025-06-10T23:10:00Z"), &Utc),
            Some(utc("2025-06-12T22:10:00Z"))
        );
    }

    #[test]
    fn window_respects_local_time_across_spring_forward() {
        let hourly = schedule(IntervalKind::CustomHours(1), at(0, 0))
            .with_time_window(TimeWindow::new(2, 3));
        // 02:00-03:00 does not exist in Berlin on 2025-03-30.
        let next = ScheduleEngine::next_run_time(&hourly, utc("2025-03-29T23:00:00Z"), &Berlin)
            .unwrap();
        assert_eq!(next.with_timezone(&Berlin).hour(), 2);
        assert_eq!(next, utc("2025-03-31T00:00:00Z"));
    }

    #[test]
    fn unmatchable_calendar_rule_has_no_next_run() {
        // Unvalidated: weekly with no weekdays never matches.
        let weekly = schedule(IntervalKind::Weekly, at(8, 0));
        assert_eq!(
            ScheduleEngine::next_run_time(&weekly, utc("2025-06-10T00:00:00Z"), &Utc),
            None
        );
    }

    #[test]
    fn wall_clock_survives_spring_forward() {
        // Berlin switches to summer time on 2025-03-30; the day lasts 23 hours.
        let daily = schedule(IntervalKind::Daily, at(9, 0));
        let next = ScheduleEngine::next_run_time(&daily, utc("2025-03-29T08:00:00Z"), &Berlin)
            .unwrap();
        assert_eq!(next, utc("2025-03-30T07:00:00Z"));
        assert_eq!(next.with_timezone(&Berlin).hour(), 9);
    }

    #[test]
    fn wall_clock_survives_fall_back() {
        // Berlin returns to standard time on 2025-10-26; the day lasts 25 hours.
        let daily = schedule(IntervalKind::Daily, at(9, 0));
        let next = ScheduleEngine::next_run_time(&daily, utc("2025-10-25T07:00:00Z"), &Berlin)
            .unwrap();
        assert_eq!(next, utc("2025-10-26T08:00:00Z"));
        assert_eq!(next.with_timezone(&Berlin).hour(), 9);
    }

    #[test]
    fn skipped_local_time_moves_past_the_gap() {
        let daily = schedule(IntervalKind::Daily, at(2, 30));
        let next = ScheduleEngine::next_run_time(&daily, utc("2025-03-29T12:00:00Z"), &Berlin)
            .unwrap();
        assert_eq!(next, utc("2025-03-30T01:30:00Z"));
    }

    #[test]
    fn repeated_local_time_takes_the_earlier_instant() {
        let daily = schedule(IntervalKind::Daily, at(2, 30));
        let next = ScheduleEngine::next_run_time(&daily, utc("2025-10-25T12:00:00Z"), &Berlin)
            .unwrap();
        assert_eq!(next, utc("2025-10-26T00:30:00Z"));
    }

    #[test]
    fn weekly_without_weekdays_is_rejected() {
        let weekly = schedule(IntervalKind::Weekly, at(8, 0));
        assert_eq!(invalid_field(ScheduleEngine::validate(&weekly)), "weekdays");
    }

    #[test]
    fn monthly_days_must_be_present_and_in_range() {
        let empty = schedule(IntervalKind::Monthly, at(8, 0));
        assert_eq!(invalid_field(ScheduleEngine::validate(&empty)), "month_days");

        let zero = schedule(IntervalKind::Monthly, at(8, 0)).with_month_days([0, 10]);
        assert_eq!(invalid_field(ScheduleEngine::validate(&zero)), "month_days");

        let too_large = schedule(IntervalKind::Monthly, at(8, 0)).with_month_days([32]);
        assert_eq!(invalid_field(ScheduleEngine::validate(&too_large)), "month_days");

        let valid = schedule(IntervalKind::Monthly, at(8, 0)).with_month_days([1, 31]);
        assert!(ScheduleEngine::validate(&valid).is_ok());
    }

    #[test]
    fn custom_hours_must_be_positive() {
        let zero = schedule(IntervalKind::CustomHours(0), at(8, 0));
        assert_eq!(invalid_field(ScheduleEngine::validate(&zero)), "interval");
    }

    #[test]
    fn window_hours_must_be_below_twenty_four() {
        let start = schedule(IntervalKind::Daily, at(8, 0)).with_time_window(TimeWindow::new(24, 6));
        assert_eq!(invalid_field(ScheduleEngine::validate(&start)), "time_window.start");

        let end = schedule(IntervalKind::Daily, at(8, 0)).with_time_window(TimeWindow::new(6, 24));
        assert_eq!(invalid_field(ScheduleEngine::validate(&end)), "time_window.end");
    }

    #[test]
    fn overnight_window_wraps_and_empty_window_is_rejected() {
        // end < start is an overnight window, accepted when the trigger time lies inside it.
        let overnight = schedule(IntervalKind::Daily, at(23, 0)).with_time_window(TimeWindow::new(22, 6));
        assert!(ScheduleEngine::validate(&overnight).is_ok());

        let early_morning = schedule(IntervalKind::Daily, at(5, 30)).with_time_window(TimeWindow::new(22, 6));
        assert!(ScheduleEngine::validate(&early_morning).is_ok());

        // The same overnight window cannot host a midday trigger.
        let midday = schedule(IntervalKind::Daily, at(12, 0)).with_time_window(TimeWindow::new(22, 6));
        assert_eq!(invalid_field(ScheduleEngine::validate(&midday)), "time_window");

        let empty = schedule(IntervalKind::Daily, at(8, 0)).with_time_window(TimeWindow::new(8, 8));
        assert_eq!(invalid_field(ScheduleEngine::validate(&empty)), "time_window");
    }

    #[test]
    fn custom_hours_window_needs_a_reachable_hour() {
        let unreachable = schedule(IntervalKind::CustomHours(24), at(12, 0))
            .with_time_window(TimeWindow::new(22, 6));
        assert_eq!(invalid_field(ScheduleEngine::validate(&unreachable)), "time_window");

        let reachable = schedule(IntervalKind::CustomHours(5), at(12, 0))
            .with_time_window(TimeWindow::new(22, 6));
        assert!(ScheduleEngine::validate(&reachable).is_ok());
    }

    #[test]
    fn validation_leaves_the_schedule_untouched() {
        let weekly = schedule(IntervalKind::Weekly, at(8, 0));
        let before = weekly.clone();
        let _ = ScheduleEngine::validate(&weekly);
        assert_eq!(weekly, before);
    }
}
