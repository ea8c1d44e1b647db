//! Scheduling rules: time normalization, overlap predicates and conflict
//! detection.
//!
//! # Responsibility
//! - Turn local wall-clock input into UTC instants and time-of-day windows.
//! - Decide whether a candidate event collides with stored events.

pub mod conflict;
pub mod overlap;
pub mod time;
