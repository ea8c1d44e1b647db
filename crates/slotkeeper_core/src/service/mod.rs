//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate validation, normalization, conflict checks and persistence.
//! - Keep the HTTP layer decoupled from storage details.

pub mod event_service;
