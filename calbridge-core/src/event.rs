//! Backend-neutral event types.
//!
//! Every backend translates its native record into `EventModel` on read and
//! builds a native record from it on write. Adapters never mutate a caller's
//! model: reads always construct fresh instances.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CalendarError, CalendarResult, Reason};

/// A calendar event (backend-neutral)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventModel {
    /// Backend-assigned identifier, absent for events not created yet
    pub id: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub title: String,
    /// May contain HTML; the local backend renders it to plain text
    pub description: Option<String>,
    /// Honored by the local backend only
    pub location: Option<String>,
    /// Honored by the local backend only
    pub url: Option<String>,
    /// Reminder, in minutes before start
    pub alarm_minutes: Option<i64>,
}

impl EventModel {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, title: impl Into<String>) -> Self {
        EventModel {
            id: None,
            start,
            end,
            title: title.into(),
            description: None,
            location: None,
            url: None,
            alarm_minutes: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_alarm(mut self, minutes_before: i64) -> Self {
        self.alarm_minutes = Some(minutes_before);
        self
    }

    /// An immediate add needs something to call the event.
    pub fn validate(&self) -> CalendarResult<()> {
        if self.title.trim().is_empty() {
            return Err(CalendarError::Message(Reason::InvalidEvent));
        }
        Ok(())
    }
}

/// How an event should be added.
#[derive(Debug, Clone, PartialEq)]
pub enum AddMethod {
    /// Create the event immediately, without user interaction
    Easy(EventModel),
    /// Let the user create or edit the event in an interactive editor.
    /// Local backend only.
    FromModal(Option<EventModel>),
}

/// What an add operation did.
#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    /// The event was written; carries the backend's status text
    Added(String),
    /// An editor was shown. Its result arrives through the backend's
    /// editing-ended notification, not through this operation.
    EditorPresented,
}
