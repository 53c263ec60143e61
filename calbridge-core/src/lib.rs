//! Core types for calbridge.
//!
//! This crate provides the pieces shared by the facade and every backend:
//! - `EventModel` and `AddMethod`, the backend-neutral event representation
//! - `CalendarError`, the error taxonomy reported by all operations
//! - `auth` for authorization states and shared pending requests
//! - `matcher` and `timezone` for identity matching and DST correction
//! - `backend` for the capability trait each backend implements

pub mod auth;
pub mod backend;
pub mod config;
pub mod date_range;
pub mod error;
pub mod event;
pub mod matcher;
pub mod target;
pub mod timezone;

// Re-export the event types at crate root for convenience
pub use event::*;
