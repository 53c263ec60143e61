//! The capability interface implemented once per backend.

use async_trait::async_trait;

use crate::date_range::DateRange;
use crate::error::CalendarResult;
use crate::event::{AddMethod, AddOutcome, EventModel};

/// One calendar backend.
///
/// Every operation authorizes first and fails with the authorization error
/// without touching the backend if that step fails.
#[async_trait]
pub trait CalendarBackend: Send + Sync {
    /// Add an event. Returns the backend's status text on success.
    async fn add_event(&self, method: AddMethod) -> CalendarResult<AddOutcome>;

    /// Locate `event` by identity match and delete it.
    ///
    /// `range` bounds the search where the backend supports it.
    async fn remove_event(
        &self,
        event: &EventModel,
        range: Option<DateRange>,
    ) -> CalendarResult<String>;

    /// Events overlapping `range`, freshly built from backend records.
    async fn events(&self, range: &DateRange) -> CalendarResult<Vec<EventModel>>;

    /// Whether the backend already holds an event matching `event`.
    async fn event_exists(&self, event: &EventModel) -> CalendarResult<bool>;
}
