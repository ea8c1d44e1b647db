//! Core scheduling logic for slotkeeper.
//! This crate is the single source of truth for the no-overlap invariant.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod schedule;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::event::{
    Event, EventId, EventSchedule, EventValidationError, NewEvent, TimeOfDayWindow, WeekdaySet,
};
pub use repo::event_repo::{EventRepository, RepoError, RepoResult, SqliteEventRepository};
pub use schedule::conflict::ConflictDetector;
pub use schedule::overlap::{day_slices, overlaps, DaySlice};
pub use schedule::time::{time_of_day, to_utc_instant, utc_time_window, TimeError};
pub use service::event_service::{
    CreateEventRequest, DateField, EventService, EventServiceError, WeekdayValue,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
