//! The remote calendar service collaborator.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use calbridge_core::date_range::DateRange;
use google_calendar::types::Event as GoogleEvent;

use crate::auth::Session;

/// A service reply: HTTP status plus decoded body.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceResponse<T> {
    pub status: u16,
    pub body: T,
}

impl<T> ServiceResponse<T> {
    pub fn new(status: u16, body: T) -> Self {
        ServiceResponse { status, body }
    }
}

/// Calendar operations of a signed-in account.
#[async_trait]
pub trait CalendarService: Send + Sync {
    async fn insert(
        &self,
        calendar_id: &str,
        event: &GoogleEvent,
    ) -> Result<ServiceResponse<GoogleEvent>>;

    /// Events of `calendar_id`, all of them when `range` is `None`.
    async fn list(
        &self,
        calendar_id: &str,
        range: Option<&DateRange>,
    ) -> Result<ServiceResponse<Vec<GoogleEvent>>>;

    async fn delete(&self, calendar_id: &str, event_id: &str) -> Result<ServiceResponse<()>>;
}

/// Builds a service handle from a session.
pub trait ServiceFactory: Send + Sync {
    /// `None` when no service can be built from `session`.
    fn build(&self, session: &Session, client_id: &str) -> Option<Arc<dyn CalendarService>>;
}
