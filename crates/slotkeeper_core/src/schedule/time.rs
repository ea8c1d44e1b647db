//! Wall-clock to UTC normalization.
//!
//! # Responsibility
//! - Resolve `YYYY-MM-DD HH:MM:SS` local datetimes in an IANA timezone to UTC.
//! - Project UTC instants onto seconds since UTC midnight.
//!
//! # Invariants
//! - The datetime pattern must match the whole input, not a substring.
//! - Local times that are ambiguous or skipped by a DST transition are
//!   rejected, never silently shifted.

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::model::event::TimeOfDayWindow;

pub const SECONDS_PER_DAY: u32 = 86_400;
pub const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static LOCAL_DATETIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2} [0-9]{2}:[0-9]{2}:[0-9]{2}$")
        .expect("valid local datetime regex")
});

pub type TimeResult<T> = Result<T, TimeError>;

/// Normalization failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    /// Timezone name is not in the IANA database.
    InvalidTimezone(String),
    /// Input is not a real `YYYY-MM-DD HH:MM:SS` datetime.
    InvalidDateFormat(String),
    /// Local time occurs twice (DST fall-back).
    AmbiguousLocalTime { local: String, timezone: String },
    /// Local time is skipped (DST spring-forward).
    NonexistentLocalTime { local: String, timezone: String },
}

impl Display for TimeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTimezone(name) => write!(f, "unknown timezone `{name}`"),
            Self::InvalidDateFormat(value) => {
                write!(f, "`{value}` is not a `YYYY-MM-DD HH:MM:SS` datetime")
            }
            Self::AmbiguousLocalTime { local, timezone } => {
                write!(f, "`{local}` is ambiguous in {timezone}")
            }
            Self::NonexistentLocalTime { local, timezone } => {
                write!(f, "`{local}` does not exist in {timezone}")
            }
        }
    }
}

impl Error for TimeError {}

/// Returns whether `value` is exactly `YYYY-MM-DD HH:MM:SS`.
///
/// Only the shape is checked; calendar validity is checked on parse.
pub fn check_datetime_format(value: &str) -> bool {
    LOCAL_DATETIME_RE.is_match(value)
}

pub fn parse_timezone(name: &str) -> TimeResult<Tz> {
    name.parse::<Tz>()
        .map_err(|_| TimeError::InvalidTimezone(name.to_string()))
}

/// Resolves a local wall-clock datetime in `timezone` to a UTC instant.
pub fn to_utc_instant(timezone: &str, local_datetime: &str) -> TimeResult<DateTime<Utc>> {
    let tz = parse_timezone(timezone)?;
    localize(tz, local_datetime)
}

/// Same as [`to_utc_instant`] with an already resolved timezone.
pub fn localize(tz: Tz, local_datetime: &str) -> TimeResult<DateTime<Utc>> {
    if !check_datetime_format(local_datetime) {
        return Err(TimeError::InvalidDateFormat(local_datetime.to_string()));
    }
    let naive = NaiveDateTime::parse_from_str(local_datetime, LOCAL_DATETIME_FORMAT)
        .map_err(|_| TimeError::InvalidDateFormat(local_datetime.to_string()))?;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(local) => Ok(local.with_timezone(&Utc)),
        LocalResult::Ambiguous(_, _) => Err(TimeError::AmbiguousLocalTime {
            local: local_datetime.to_string(),
            timezone: tz.name().to_string(),
        }),
        LocalResult::None => Err(TimeError::NonexistentLocalTime {
            local: local_datetime.to_string(),
            timezone: tz.name().to_string(),
        }),
    }
}

/// Seconds elapsed since UTC midnight of the instant's calendar day.
pub fn time_of_day(instant: DateTime<Utc>) -> u32 {
    instant.num_seconds_from_midnight()
}

/// Time-of-day projection of a local start/end pair.
pub fn utc_time_window(timezone: &str, start: &str, end: &str) -> TimeResult<TimeOfDayWindow> {
    let tz = parse_timezone(timezone)?;
    Ok(TimeOfDayWindow::between(
        localize(tz, start)?,
        localize(tz, end)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use proptest::prelude::*;

    #[test]
    fn format_check_requires_full_match() {
        assert!(check_datetime_format("2024-01-01 10:00:00"));
        assert!(!check_datetime_format("2024-1-1 10:00:00"));
        assert!(!check_datetime_format("x2024-01-01 10:00:00"));
        assert!(!check_datetime_format("2024-01-01 10:00:00 "));
        assert!(!check_datetime_format("2024-01-01T10:00:00"));
        assert!(!check_datetime_format("2024-01-01 10:00:00\n2024"));
    }

    #[test]
    fn converts_named_timezone_to_utc() {
        let instant = to_utc_instant("America/New_York", "2024-01-15 09:30:00").unwrap();
        assert_eq!(instant.to_rfc3339(), "2024-01-15T14:30:00+00:00");
        assert_eq!(time_of_day(instant), 14 * 3600 + 30 * 60);
    }

    #[test]
    fn rejects_unknown_timezone_and_impossible_dates() {
        assert_eq!(
            to_utc_instant("Mars/Olympus", "2024-01-15 09:30:00"),
            Err(TimeError::InvalidTimezone("Mars/Olympus".to_string()))
        );
        assert!(matches!(
            to_utc_instant("UTC", "2024-02-30 09:30:00"),
            Err(TimeError::InvalidDateFormat(_))
        ));
        assert!(matches!(
            to_utc_instant("UTC", "2024-01-01 24:00:00"),
            Err(TimeError::InvalidDateFormat(_))
        ));
    }

    #[test]
    fn rejects_dst_gap_and_overlap() {
        // 2024-03-10 02:30 is skipped, 2024-11-03 01:30 happens twice.
        assert!(matches!(
            to_utc_instant("America/New_York", "2024-03-10 02:30:00"),
            Err(TimeError::NonexistentLocalTime { .. })
        ));
        assert!(matches!(
            to_utc_instant("America/New_York", "2024-11-03 01:30:00"),
            Err(TimeError::AmbiguousLocalTime { .. })
        ));
    }

    #[test]
    fn utc_time_window_projects_both_ends() {
        let window =
            utc_time_window("America/Los_Angeles", "2024-07-01 09:00:00", "2024-07-01 10:00:00")
                .unwrap();
        assert_eq!(window, TimeOfDayWindow::new(16 * 3600, 17 * 3600));
    }

    proptest! {
        #[test]
        fn normalization_is_deterministic(
            offset_hours in -12i32..=12,
            secs in 0i64..(400 * 86_400),
        ) {
            let tz = fixed_offset_zone(offset_hours);
            let local = format_local(secs);
            let first = to_utc_instant(&tz, &local).unwrap();
            let second = to_utc_instant(&tz, &local).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn time_of_day_is_stable_across_whole_day_shifts(
            offset_hours in -12i32..=12,
            secs in 0i64..(400 * 86_400),
            days in 0i64..60,
        ) {
            let tz = fixed_offset_zone(offset_hours);
            let base = to_utc_instant(&tz, &format_local(secs)).unwrap();
            let shifted = to_utc_instant(&tz, &format_local(secs + days * 86_400)).unwrap();
            prop_assert_eq!(time_of_day(base), time_of_day(shifted));
            prop_assert!(time_of_day(base) < SECONDS_PER_DAY);
        }
    }

    // `Etc/GMT+5` is UTC-5: the sign is inverted in the IANA naming.
    fn fixed_offset_zone(offset_hours: i32) -> String {
        if offset_hours == 0 {
            return "Etc/GMT".to_string();
        }
        let sign = if offset_hours > 0 { '-' } else { '+' };
        format!("Etc/GMT{sign}{}", offset_hours.abs())
    }

    fn format_local(secs_since_2024: i64) -> String {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (base + Duration::seconds(secs_since_2024))
            .format(LOCAL_DATETIME_FORMAT)
            .to_string()
    }
}
