//! Pure recurrence arithmetic.
//!
//! Deliberately agnostic to the enabled/deleted flags so it stays usable
//! for what-if previews; the dispatcher filters on those before asking.

use chrono::{DateTime, Duration, Months, Utc};

use chronod_store::{JobDefinition, TimeUnit};

/// End of one recurrence period starting at `from`.
///
/// Seconds through days are fixed-length; months and years use calendar
/// addition (`Jan 31 + 1 month = Feb 28/29`) so long-period jobs don't
/// drift. Out-of-range arithmetic saturates to the far future, which makes
/// the job never due rather than wrapping.
pub fn period_end(from: DateTime<Utc>, interval_value: u32, time_unit: TimeUnit) -> DateTime<Utc> {
    let n = interval_value as i64;
    match time_unit {
        TimeUnit::Second => from + Duration::seconds(n),
        TimeUnit::Minute => from + Duration::minutes(n),
        TimeUnit::Hour => from + Duration::hours(n),
        TimeUnit::Day => from + Duration::days(n),
        TimeUnit::Month => from
            .checked_add_months(Months::new(interval_value))
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
        TimeUnit::Year => from
            .checked_add_months(Months::new(interval_value.saturating_mul(12)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
    }
}

/// Next instant at which `def` becomes eligible, or `None` when it has
/// never run (eligible immediately).
pub fn next_run_time(def: &JobDefinition) -> Option<DateTime<Utc>> {
    def.last_run_time
        .map(|last| period_end(last, def.interval_value, def.time_unit))
}

/// Whether `def` is eligible to run at `now`.
///
/// A never-run definition is always due. Otherwise due once `now` reaches
/// the period boundary; equality counts as due.
pub fn is_due(def: &JobDefinition, now: DateTime<Utc>) -> bool {
    match next_run_time(def) {
        None => true,
        Some(next) => now >= next,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chronod_store::RunStatus;

    fn def_with(
        interval_value: u32,
        time_unit: TimeUnit,
        last_run_time: Option<DateTime<Utc>>,
    ) -> JobDefinition {
        JobDefinition {
            id: "test".into(),
            name: "test".into(),
            system_name: "test".into(),
            interval_value,
            time_unit,
            enabled: true,
            deleted: false,
            last_run_time,
            last_run_status: RunStatus::Never,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn never_run_is_always_due() {
        let def = def_with(5, TimeUnit::Minute, None);
        assert!(is_due(&def, Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap()));
        assert!(is_due(&def, Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn minute_boundary_with_tie_counting_as_due() {
        let t = Utc.with_ymd_and_hms(2026, 8, 28, 12, 0, 0).unwrap();
        let def = def_with(3, TimeUnit::Minute, Some(t));

        assert!(!is_due(&def, t + Duration::seconds(3 * 60 - 1)));
        assert!(is_due(&def, t + Duration::seconds(3 * 60)));
        assert!(is_due(&def, t + Duration::seconds(3 * 60 + 1)));
    }

    #[test]
    fn fixed_units_compute_exact_periods() {
        let t = Utc.with_ymd_and_hms(2026, 8, 28, 12, 0, 0).unwrap();
        assert_eq!(period_end(t, 30, TimeUnit::Second), t + Duration::seconds(30));
        assert_eq!(period_end(t, 2, TimeUnit::Hour), t + Duration::hours(2));
        assert_eq!(period_end(t, 10, TimeUnit::Day), t + Duration::days(10));
    }

    #[test]
    fn month_addition_is_calendar_aware() {
        // Jan 31 + 1 month clamps to the end of February instead of
        // spilling into March the way a fixed 30-day period would.
        let jan31 = Utc.with_ymd_and_hms(2025, 1, 31, 6, 0, 0).unwrap();
        assert_eq!(
            period_end(jan31, 1, TimeUnit::Month),
            Utc.with_ymd_and_hms(2025, 2, 28, 6, 0, 0).unwrap()
        );

        let def = def_with(1, TimeUnit::Month, Some(jan31));
        assert!(!is_due(&def, Utc.with_ymd_and_hms(2025, 2, 28, 5, 59, 59).unwrap()));
        assert!(is_due(&def, Utc.with_ymd_and_hms(2025, 2, 28, 6, 0, 0).unwrap()));
    }

    #[test]
    fn year_addition_handles_leap_days() {
        let leap = Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap();
        assert_eq!(
            period_end(leap, 1, TimeUnit::Year),
            Utc.with_ymd_and_hms(2025, 2, 28, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn next_run_time_mirrors_last_run() {
        let t = Utc.with_ymd_and_hms(2026, 8, 28, 12, 0, 0).unwrap();
        assert!(next_run_time(&def_with(1, TimeUnit::Hour, None)).is_none());
        assert_eq!(
            next_run_time(&def_with(1, TimeUnit::Hour, Some(t))),
            Some(t + Duration::hours(1))
        );
    }
}
