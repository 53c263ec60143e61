//! calbridge-provider-google - the remote calendar backend.
//!
//! `RemoteBackend` implements the calbridge capability interface on top of a
//! `CalendarService` obtained from a signed-in `Session`. The `google`
//! module provides the Google Calendar implementations of those
//! collaborators.

mod auth;
mod backend;
mod convert;
pub mod google;
mod service;

pub use auth::{Session, SessionProvider, SignInCoordinator, SignInRequest};
pub use backend::RemoteBackend;
pub use convert::{FromGoogle, ToGoogle};
pub use service::{CalendarService, ServiceFactory, ServiceResponse};

/// Google's event record, the remote backend's native type
pub use google_calendar::types::Event as GoogleEvent;
