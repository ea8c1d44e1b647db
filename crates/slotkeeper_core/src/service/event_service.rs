//! Event use-case service.
//!
//! # Responsibility
//! - Validate create requests in a fixed order and fail fast.
//! - Normalize local input to UTC and run conflict detection.
//! - Persist only when every check passes.
//!
//! # Invariants
//! - Field presence and datetime shape are checked before any timezone
//!   resolution or store access.
//! - Only the first failing check is reported.
//! - Conflict checks and the insert run in one atomic repository scope.
//! - Recurring windows need `end_time > start_time`; one-off spans accept
//!   `end == start`.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::{debug, error, info};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::model::event::{Event, EventId, NewEvent, TimeOfDayWindow, WeekdaySet};
use crate::repo::event_repo::{EventRepository, RepoError};
use crate::schedule::conflict::ConflictDetector;
use crate::schedule::time::{check_datetime_format, localize, parse_timezone, TimeError};

/// Which of the two request datetimes an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Start,
    End,
}

impl Display for DateField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::End => write!(f, "end"),
        }
    }
}

/// Service error for event use-cases.
///
/// Every variant except `Repo` is caused by client input.
#[derive(Debug)]
pub enum EventServiceError {
    MissingFields(Vec<&'static str>),
    InvalidDateFormat(DateField),
    InvalidTimezone(String),
    /// Local time falls into a DST gap or overlap.
    UnresolvableLocalTime {
        field: DateField,
        timezone: String,
    },
    InvalidRecurringDays(String),
    InvalidOrdering {
        recurring: bool,
    },
    SchedulingConflict {
        title: String,
    },
    Repo(RepoError),
}

impl EventServiceError {
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Repo(_))
    }

    fn from_time_error(field: DateField, err: TimeError) -> Self {
        match err {
            TimeError::InvalidTimezone(name) => Self::InvalidTimezone(name),
            TimeError::InvalidDateFormat(_) => Self::InvalidDateFormat(field),
            TimeError::AmbiguousLocalTime { timezone, .. }
            | TimeError::NonexistentLocalTime { timezone, .. } => {
                Self::UnresolvableLocalTime { field, timezone }
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::MissingFields(_) => "missing_fields",
            Self::InvalidDateFormat(_) => "invalid_date_format",
            Self::InvalidTimezone(_) => "invalid_timezone",
            Self::UnresolvableLocalTime { .. } => "unresolvable_local_time",
            Self::InvalidRecurringDays(_) => "invalid_recurring_days",
            Self::InvalidOrdering { .. } => "invalid_ordering",
            Self::SchedulingConflict { .. } => "scheduling_conflict",
            Self::Repo(_) => "repo_error",
        }
    }
}

impl Display for EventServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingFields(fields) => write!(f, "{} are required", fields.join(", ")),
            Self::InvalidDateFormat(field) => {
                write!(f, "{field} date time is in incorrect format")
            }
            Self::InvalidTimezone(name) => write!(f, "Unknown timezone {name}"),
            Self::UnresolvableLocalTime { field, timezone } => write!(
                f,
                "{field} date time does not exist or is ambiguous in timezone {timezone}"
            ),
            Self::InvalidRecurringDays(message) => write!(f, "{message}"),
            Self::InvalidOrdering { recurring: true } => {
                write!(f, "Ending time cannot be before start time")
            }
            Self::InvalidOrdering { recurring: false } => {
                write!(f, "Ending date time cannot be before start date time")
            }
            Self::SchedulingConflict { title } => {
                write!(f, "Event date time conflicts with an existing event {title}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EventServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for EventServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Create request as received from callers. Every field is optional so
/// presence can be reported with the full list of missing names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreateEventRequest {
    pub title: Option<String>,
    pub timezone: Option<String>,
    /// Local `YYYY-MM-DD HH:MM:SS`.
    pub start: Option<String>,
    /// Local `YYYY-MM-DD HH:MM:SS`.
    pub end: Option<String>,
    pub recurring: Option<bool>,
    /// Weekday indices, `0=Monday .. 6=Sunday`.
    pub recurring_days: Option<Vec<WeekdayValue>>,
}

/// One `recurring_days` element: `2` and `"2"` both name Wednesday.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WeekdayValue {
    Index(i64),
    Text(String),
}

impl WeekdayValue {
    fn index(&self) -> Option<i64> {
        match self {
            Self::Index(index) => Some(*index),
            Self::Text(text) => text.parse().ok(),
        }
    }
}

impl From<i64> for WeekdayValue {
    fn from(value: i64) -> Self {
        Self::Index(value)
    }
}

impl Display for WeekdayValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{index}"),
            Self::Text(text) => write!(f, "\"{text}\""),
        }
    }
}

struct RequiredFields<'a> {
    title: &'a str,
    timezone: &'a str,
    start: &'a str,
    end: &'a str,
}

impl CreateEventRequest {
    fn required_fields(&self) -> Result<RequiredFields<'_>, EventServiceError> {
        let mut missing = Vec::new();
        for (name, value) in [
            ("title", &self.title),
            ("timezone", &self.timezone),
            ("start", &self.start),
            ("end", &self.end),
        ] {
            if value.is_none() {
                missing.push(name);
            }
        }

        match (&self.title, &self.timezone, &self.start, &self.end) {
            (Some(title), Some(timezone), Some(start), Some(end)) => Ok(RequiredFields {
                title,
                timezone,
                start,
                end,
            }),
            _ => Err(EventServiceError::MissingFields(missing)),
        }
    }
}

/// Event service facade over repository implementations.
pub struct EventService<R: EventRepository> {
    repo: R,
}

impl<R: EventRepository> EventService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Validates, checks for conflicts and stores one event.
    pub fn create_event(&self, request: &CreateEventRequest) -> Result<EventId, EventServiceError> {
        self.create_event_at(request, Utc::now())
    }

    /// Same as [`Self::create_event`] with an explicit "now", which decides
    /// which one-off events a new recurring event is checked against.
    pub fn create_event_at(
        &self,
        request: &CreateEventRequest,
        now: DateTime<Utc>,
    ) -> Result<EventId, EventServiceError> {
        let recurring = request.recurring == Some(true);
        let result = self.try_create(request, recurring, now);

        match &result {
            Ok(id) => info!(
                "event=event_create module=service status=ok id={id} recurring={recurring}"
            ),
            Err(err) if err.is_client_error() => debug!(
                "event=event_create module=service status=rejected recurring={} error_code={}",
                recurring,
                err.code()
            ),
            Err(err) => error!(
                "event=event_create module=service status=error recurring={} error_code={} error={}",
                recurring,
                err.code(),
                err
            ),
        }
        result
    }

    /// Lists all stored events in store order.
    pub fn list_events(&self) -> Result<Vec<Event>, EventServiceError> {
        Ok(self.repo.list_events()?)
    }

    /// Removes an event by id. Unknown ids succeed.
    pub fn delete_event(&self, id: EventId) -> Result<(), EventServiceError> {
        self.repo.delete_event(id)?;
        info!("event=event_delete module=service status=ok id={id}");
        Ok(())
    }

    fn try_create(
        &self,
        request: &CreateEventRequest,
        recurring: bool,
        now: DateTime<Utc>,
    ) -> Result<EventId, EventServiceError> {
        let fields = request.required_fields()?;
        if !check_datetime_format(fields.start) {
            return Err(EventServiceError::InvalidDateFormat(DateField::Start));
        }
        if !check_datetime_format(fields.end) {
            return Err(EventServiceError::InvalidDateFormat(DateField::End));
        }

        if recurring {
            let days = parse_recurring_days(request.recurring_days.as_deref())?;
            self.create_weekly(&fields, days, now)
        } else {
            self.create_one_off(&fields)
        }
    }

    fn create_one_off(&self, fields: &RequiredFields<'_>) -> Result<EventId, EventServiceError> {
        let (start, end) = resolve_span(fields)?;
        if end < start {
            return Err(EventServiceError::InvalidOrdering { recurring: false });
        }

        let event = NewEvent::one_off(fields.title, start, end);
        self.repo.atomically(|repo| -> Result<EventId, EventServiceError> {
            if let Some(existing) = ConflictDetector::new(repo).find_for_one_off(start, end)? {
                return Err(EventServiceError::SchedulingConflict {
                    title: existing.title,
                });
            }
            Ok(repo.insert_event(&event)?)
        })
    }

    fn create_weekly(
        &self,
        fields: &RequiredFields<'_>,
        days: WeekdaySet,
        now: DateTime<Utc>,
    ) -> Result<EventId, EventServiceError> {
        let (start, end) = resolve_span(fields)?;
        let window = TimeOfDayWindow::between(start, end);
        if !window.is_forward() {
            return Err(EventServiceError::InvalidOrdering { recurring: true });
        }

        let event = NewEvent::weekly(fields.title, days, window);
        self.repo.atomically(|repo| -> Result<EventId, EventServiceError> {
            if let Some(existing) =
                ConflictDetector::new(repo).find_for_weekly(&days, &window, now)?
            {
                return Err(EventServiceError::SchedulingConflict {
                    title: existing.title,
                });
            }
            Ok(repo.insert_event(&event)?)
        })
    }
}

fn parse_recurring_days(days: Option<&[WeekdayValue]>) -> Result<WeekdaySet, EventServiceError> {
    let days = days.ok_or_else(|| EventServiceError::MissingFields(vec!["recurring_days"]))?;
    if days.is_empty() {
        return Err(EventServiceError::InvalidRecurringDays(
            "recurring_days must contain at least one day".to_string(),
        ));
    }

    let mut indices = Vec::with_capacity(days.len());
    for day in days {
        indices.push(day.index().ok_or_else(|| not_a_weekday(day))?);
    }
    WeekdaySet::from_indices(indices).map_err(not_a_weekday)
}

fn not_a_weekday(value: impl Display) -> EventServiceError {
    EventServiceError::InvalidRecurringDays(format!(
        "recurring_days value {value} is not a weekday between 0 and 6"
    ))
}

fn resolve_span(
    fields: &RequiredFields<'_>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), EventServiceError> {
    let tz: Tz = parse_timezone(fields.timezone)
        .map_err(|err| EventServiceError::from_time_error(DateField::Start, err))?;
    let start = localize(tz, fields.start)
        .map_err(|err| EventServiceError::from_time_error(DateField::Start, err))?;
    let end = localize(tz, fields.end)
        .map_err(|err| EventServiceError::from_time_error(DateField::End, err))?;
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_are_listed_in_request_order() {
        let request = CreateEventRequest {
            timezone: Some("UTC".to_string()),
            ..CreateEventRequest::default()
        };
        let err = request.required_fields().err().unwrap();
        assert_eq!(err.to_string(), "title, start, end are required");
    }

    #[test]
    fn null_field_counts_as_missing() {
        let request: CreateEventRequest = serde_json::from_str(
            r#"{"title": null, "timezone": "UTC", "start": "2030-01-07 09:00:00", "end": "2030-01-07 10:00:00"}"#,
        )
        .unwrap();
        let err = request.required_fields().err().unwrap();
        assert_eq!(err.to_string(), "title are required");
    }

    #[test]
    fn ordering_messages_differ_by_event_kind() {
        assert_eq!(
            EventServiceError::InvalidOrdering { recurring: true }.to_string(),
            "Ending time cannot be before start time"
        );
        assert_eq!(
            EventServiceError::InvalidOrdering { recurring: false }.to_string(),
            "Ending date time cannot be before start date time"
        );
    }

    fn days(values: &[i64]) -> Vec<WeekdayValue> {
        values.iter().copied().map(WeekdayValue::from).collect()
    }

    #[test]
    fn recurring_days_need_valid_weekdays() {
        assert!(matches!(
            parse_recurring_days(None),
            Err(EventServiceError::MissingFields(fields)) if fields == vec!["recurring_days"]
        ));
        assert!(matches!(
            parse_recurring_days(Some(&[])),
            Err(EventServiceError::InvalidRecurringDays(_))
        ));
        assert!(matches!(
            parse_recurring_days(Some(days(&[0, 9]).as_slice())),
            Err(EventServiceError::InvalidRecurringDays(message)) if message.contains('9')
        ));
        assert_eq!(
            parse_recurring_days(Some(days(&[4, 0]).as_slice())).unwrap().to_db_string(),
            "0,4"
        );
    }

    #[test]
    fn recurring_days_accept_digit_strings() {
        let request: CreateEventRequest =
            serde_json::from_str(r#"{"recurring": true, "recurring_days": ["0", 2, "4"]}"#).unwrap();
        let days = parse_recurring_days(request.recurring_days.as_deref()).unwrap();
        assert_eq!(days.to_db_string(), "0,2,4");
    }

    #[test]
    fn non_numeric_day_is_a_domain_error() {
        let request: CreateEventRequest =
            serde_json::from_str(r#"{"recurring_days": ["0", "monday"]}"#).unwrap();
        let err = parse_recurring_days(request.recurring_days.as_deref()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "recurring_days value \"monday\" is not a weekday between 0 and 6"
        );

        let request: CreateEventRequest =
            serde_json::from_str(r#"{"recurring_days": ["7"]}"#).unwrap();
        assert!(matches!(
            parse_recurring_days(request.recurring_days.as_deref()),
            Err(EventServiceError::InvalidRecurringDays(message)) if message.contains('7')
        ));
    }
}
