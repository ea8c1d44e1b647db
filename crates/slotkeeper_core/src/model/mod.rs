//! Domain model for scheduled events.
//!
//! # Responsibility
//! - Define the stored event shape and the creation draft.
//! - Keep recurring and non-recurring shapes mutually exclusive.
//!
//! # Invariants
//! - Every stored event is identified by a store-assigned `EventId`.
//! - Events are never updated in place; deletion is a hard delete.

pub mod event;
