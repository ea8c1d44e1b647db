//! Event domain model.
//!
//! # Responsibility
//! - Define the persisted event record and the draft used for creation.
//! - Encode weekday sets and time-of-day windows in one canonical shape.
//!
//! # Invariants
//! - A recurring event has a non-empty weekday set and `end_time > start_time`.
//! - A non-recurring event has `end_datetime >= start_datetime`.
//! - Time-of-day offsets are seconds since UTC midnight, in `[0, 86400]`.

use chrono::{DateTime, Utc, Weekday};
use serde::{Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::schedule::time::{time_of_day, SECONDS_PER_DAY};

/// Store-assigned event identifier.
pub type EventId = i64;

const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Set of weekdays a recurring event repeats on.
///
/// Weekdays are identified by `0=Monday .. 6=Sunday`, matching
/// `chrono::Weekday::num_days_from_monday`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    /// Empty set.
    pub const EMPTY: WeekdaySet = WeekdaySet(0);

    /// Builds a set from weekday indices. Returns the first out-of-range index
    /// as the error.
    pub fn from_indices<I>(indices: I) -> Result<Self, i64>
    where
        I: IntoIterator<Item = i64>,
    {
        let mut set = Self::EMPTY;
        for index in indices {
            let weekday = usize::try_from(index)
                .ok()
                .and_then(|i| ALL_WEEKDAYS.get(i))
                .ok_or(index)?;
            set.insert(*weekday);
        }
        Ok(set)
    }

    pub fn insert(&mut self, weekday: Weekday) {
        self.0 |= 1 << weekday.num_days_from_monday();
    }

    pub fn contains(&self, weekday: Weekday) -> bool {
        self.0 & (1 << weekday.num_days_from_monday()) != 0
    }

    pub fn intersects(&self, other: &WeekdaySet) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterates member weekdays from Monday to Sunday.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        ALL_WEEKDAYS
            .iter()
            .copied()
            .filter(move |weekday| self.contains(*weekday))
    }

    /// Comma-joined weekday digits, e.g. `"0,2"`.
    pub fn to_db_string(&self) -> String {
        self.iter()
            .map(|weekday| weekday.num_days_from_monday().to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Parses the comma-joined storage form. Returns `None` on any malformed
    /// or out-of-range element.
    pub fn parse_db_string(value: &str) -> Option<Self> {
        let mut indices = Vec::new();
        for part in value.split(',') {
            indices.push(part.trim().parse::<i64>().ok()?);
        }
        Self::from_indices(indices).ok()
    }
}

/// Seconds-since-UTC-midnight window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDayWindow {
    pub start: u32,
    pub end: u32,
}

impl TimeOfDayWindow {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Projects two instants onto their UTC time of day.
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self::new(time_of_day(start), time_of_day(end))
    }

    /// Whether `end` lies strictly after `start` within one day.
    pub fn is_forward(&self) -> bool {
        self.end > self.start
    }
}

/// Temporal shape of an event about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSchedule {
    /// Single occurrence between two absolute UTC instants.
    OneOff {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Weekly repetition on `days` within a UTC time-of-day window.
    Weekly {
        days: WeekdaySet,
        window: TimeOfDayWindow,
    },
}

/// Draft of an event that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub title: String,
    pub schedule: EventSchedule,
}

impl NewEvent {
    pub fn one_off(title: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            schedule: EventSchedule::OneOff { start, end },
        }
    }

    pub fn weekly(title: impl Into<String>, days: WeekdaySet, window: TimeOfDayWindow) -> Self {
        Self {
            title: title.into(),
            schedule: EventSchedule::Weekly { days, window },
        }
    }

    /// Time-of-day projection stored alongside every event.
    pub fn window(&self) -> TimeOfDayWindow {
        match &self.schedule {
            EventSchedule::OneOff { start, end } => TimeOfDayWindow::between(*start, *end),
            EventSchedule::Weekly { window, .. } => *window,
        }
    }

    /// Checks shape invariants before persistence.
    pub fn validate(&self) -> Result<(), EventValidationError> {
        match &self.schedule {
            EventSchedule::OneOff { start, end } => {
                if end < start {
                    return Err(EventValidationError::EndBeforeStart);
                }
            }
            EventSchedule::Weekly { days, window } => {
                if days.is_empty() {
                    return Err(EventValidationError::EmptyWeekdaySet);
                }
                if !window.is_forward() || window.end > SECONDS_PER_DAY {
                    return Err(EventValidationError::InvalidWindow(*window));
                }
            }
        }
        Ok(())
    }
}

/// Shape violation detected on an event record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventValidationError {
    EndBeforeStart,
    EmptyWeekdaySet,
    InvalidWindow(TimeOfDayWindow),
}

impl Display for EventValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EndBeforeStart => write!(f, "event end is before event start"),
            Self::EmptyWeekdaySet => write!(f, "recurring event needs at least one weekday"),
            Self::InvalidWindow(window) => write!(
                f,
                "invalid time-of-day window {}..{}",
                window.start, window.end
            ),
        }
    }
}

impl Error for EventValidationError {}

/// Stored event, serialized with the raw column names of the `event` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    #[serde(serialize_with = "serialize_flag")]
    pub recurring: bool,
    #[serde(serialize_with = "serialize_weekdays")]
    pub recurring_days: Option<WeekdaySet>,
    /// Epoch seconds. Set for non-recurring events only.
    pub start_datetime: Option<i64>,
    /// Epoch seconds. Set for non-recurring events only.
    pub end_datetime: Option<i64>,
    pub start_time: u32,
    pub end_time: u32,
}

impl Event {
    pub fn window(&self) -> TimeOfDayWindow {
        TimeOfDayWindow::new(self.start_time, self.end_time)
    }

    /// Absolute span of a non-recurring event.
    pub fn instants(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = DateTime::from_timestamp(self.start_datetime?, 0)?;
        let end = DateTime::from_timestamp(self.end_datetime?, 0)?;
        Some((start, end))
    }
}

fn serialize_flag<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*value))
}

fn serialize_weekdays<S: Serializer>(
    value: &Option<WeekdaySet>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(days) => serializer.serialize_str(&days.to_db_string()),
        None => serializer.serialize_none(),
    }
}
