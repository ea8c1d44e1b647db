//! Conflict detection across the four event type pairings.
//!
//! # Responsibility
//! - Find the first stored event that overlaps a creation candidate.
//!
//! # Invariants
//! - One-off vs one-off compares absolute instants only.
//! - Weekly vs weekly needs both a shared weekday and overlapping windows.
//! - One-off vs weekly compares per-UTC-day slices of the one-off against
//!   the weekly window on the slice's own weekday.
//! - Weekly candidates are only checked against one-offs starting after
//!   `now`; past one-offs cannot collide with future repetitions.

use chrono::{DateTime, Utc};

use crate::model::event::{Event, TimeOfDayWindow, WeekdaySet};
use crate::repo::event_repo::{EventRepository, RepoResult};
use crate::schedule::overlap::{day_slices, windows_overlap, DaySlice};

/// Conflict lookups bound to one repository.
pub struct ConflictDetector<'r, R: EventRepository> {
    repo: &'r R,
}

impl<'r, R: EventRepository> ConflictDetector<'r, R> {
    pub fn new(repo: &'r R) -> Self {
        Self { repo }
    }

    /// First stored event colliding with a one-off candidate.
    pub fn find_for_one_off(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepoResult<Option<Event>> {
        if let Some(event) = self
            .repo
            .find_one_off_overlapping(start.timestamp(), end.timestamp())?
        {
            return Ok(Some(event));
        }

        let slices = day_slices(start, end);
        for event in self.repo.list_recurring()? {
            let Some(days) = event.recurring_days else {
                continue;
            };
            let window = event.window();
            if slices.iter().any(|slice| slice.hits_weekly(&days, &window)) {
                return Ok(Some(event));
            }
        }

        Ok(None)
    }

    /// First stored event colliding with a weekly candidate.
    pub fn find_for_weekly(
        &self,
        days: &WeekdaySet,
        window: &TimeOfDayWindow,
        now: DateTime<Utc>,
    ) -> RepoResult<Option<Event>> {
        for event in self.repo.list_recurring()? {
            let shares_day = event
                .recurring_days
                .is_some_and(|existing| existing.intersects(days));
            if shares_day && windows_overlap(&event.window(), window) {
                return Ok(Some(event));
            }
        }

        for event in self.repo.list_one_off_starting_after(now.timestamp())? {
            if one_off_slices(&event)
                .iter()
                .any(|slice| slice.hits_weekly(days, window))
            {
                return Ok(Some(event));
            }
        }

        Ok(None)
    }
}

fn one_off_slices(event: &Event) -> Vec<DaySlice> {
    match event.instants() {
        Some((start, end)) => day_slices(start, end),
        None => Vec::new(),
    }
}
