//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the data access contract the event service and conflict
//!   detector depend on.
//! - Isolate SQLite query details from scheduling rules.
//!
//! # Invariants
//! - Repository writes enforce `NewEvent::validate()` before persistence.

pub mod event_repo;
