//! Error types for calbridge operations.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::auth::AuthorizationStatus;

/// Errors reported by backend operations.
///
/// Cloneable so a single pending authorization outcome can be handed to
/// every caller waiting on it.
#[derive(Error, Debug, Clone)]
pub enum CalendarError {
    /// The local store refuses access and will not prompt again
    #[error("Calendar access not authorized (status: {0})")]
    AuthorizationDenied(AuthorizationStatus),

    /// The user answered an access request with "no"
    #[error("Calendar access request was denied")]
    AccessRequestDenied,

    /// A backend reported an error; passed through unchanged
    #[error("{0}")]
    Underlying(Arc<dyn std::error::Error + Send + Sync>),

    /// A logic failure with a stable reason code
    #[error("{0}")]
    Message(Reason),
}

impl CalendarError {
    /// Wrap a backend-reported error.
    pub fn underlying(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        CalendarError::Underlying(Arc::from(error.into()))
    }

    /// The reason code, if this is a synthesized message error.
    pub fn reason(&self) -> Option<Reason> {
        match self {
            CalendarError::Message(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl From<Reason> for CalendarError {
    fn from(reason: Reason) -> Self {
        CalendarError::Message(reason)
    }
}

/// Reasons for synthesized (non-backend) failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    ModalNotAvailable,
    ServiceUnavailable,
    ListUnavailable,
    CantFindEvent,
    EventAlreadyExists,
    InvalidEvent,
    AuthorizationFail,
    Unknown,
}

impl Reason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Reason::ModalNotAvailable => "modal_not_available",
            Reason::ServiceUnavailable => "service_unavailable",
            Reason::ListUnavailable => "list_unavailable",
            Reason::CantFindEvent => "cant_find_event",
            Reason::EventAlreadyExists => "event_already_exists",
            Reason::InvalidEvent => "invalid_event",
            Reason::AuthorizationFail => "authorization_fail",
            Reason::Unknown => "unknown",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Reason::ModalNotAvailable => "Modal event editing is not available for this calendar",
            Reason::ServiceUnavailable => "Calendar service could not be created for the session",
            Reason::ListUnavailable => "Events could not be listed for the requested range",
            Reason::CantFindEvent => "Can't find event in calendar",
            Reason::EventAlreadyExists => "Event already exists",
            Reason::InvalidEvent => "Event not valid",
            Reason::AuthorizationFail => "Account is not signed in",
            Reason::Unknown => "Unknown error",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.code())
    }
}

/// Result type alias for calbridge operations.
pub type CalendarResult<T> = Result<T, CalendarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_underlying_keeps_message() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "store is locked");
        let error = CalendarError::underlying(io);

        assert_eq!(error.to_string(), "store is locked");
        assert_eq!(error.reason(), None);
    }

    #[test]
    fn test_message_display_includes_code() {
        let error = CalendarError::from(Reason::CantFindEvent);
        assert_eq!(
            error.to_string(),
            "Can't find event in calendar (cant_find_event)"
        );
        assert_eq!(error.reason(), Some(Reason::CantFindEvent));
    }

    #[test]
    fn test_denied_status_display() {
        let error = CalendarError::AuthorizationDenied(AuthorizationStatus::Restricted);
        assert_eq!(
            error.to_string(),
            "Calendar access not authorized (status: restricted)"
        );
    }
}
