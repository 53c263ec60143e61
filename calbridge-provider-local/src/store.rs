//! The local calendar store collaborator and its native record.

use anyhow::Result;
use async_trait::async_trait;
use calbridge_core::EventModel;
use calbridge_core::auth::AuthorizationStatus;
use chrono::{DateTime, Utc};
use url::Url;

/// A device-local calendar store.
#[async_trait]
pub trait CalendarStore: Send + Sync {
    /// Current permission state. Never prompts.
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Ask for access. May present a permission prompt; resolves to whether
    /// access was granted.
    async fn request_access(&self) -> Result<bool>;

    /// Calendar new events are written to.
    fn default_calendar(&self) -> String;

    /// Events overlapping `from..=to`.
    async fn events(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<NativeEvent>>;

    /// Persist an event, assigning an id if it has none.
    async fn save(&self, event: NativeEvent) -> Result<NativeEvent>;

    async fn remove(&self, event: &NativeEvent) -> Result<()>;
}

/// An event as the local store keeps it.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeEvent {
    /// Store-assigned identifier
    pub id: Option<String>,
    pub title: String,
    /// Empty when the event has no notes
    pub notes: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: Option<String>,
    pub url: Option<Url>,
    /// Alarm offsets, in minutes before start
    pub alarms: Vec<i64>,
    pub calendar: String,
}

impl NativeEvent {
    /// Native record for `model`, to be saved into `calendar`.
    ///
    /// The id is left for the store to assign. URLs that do not parse are
    /// dropped.
    pub fn from_model(model: &EventModel, calendar: impl Into<String>) -> Self {
        let url = model.url.as_deref().and_then(|raw| match Url::parse(raw) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(url = raw, error = %e, "dropping unparseable event url");
                None
            }
        });

        NativeEvent {
            id: None,
            title: model.title.clone(),
            notes: model.description.clone().unwrap_or_default(),
            start: model.start,
            end: model.end,
            location: model.location.clone(),
            url,
            alarms: model.alarm_minutes.into_iter().collect(),
            calendar: calendar.into(),
        }
    }
}

impl From<&NativeEvent> for EventModel {
    fn from(event: &NativeEvent) -> Self {
        EventModel {
            id: event.id.clone(),
            start: event.start,
            end: event.end,
            title: event.title.clone(),
            description: if event.notes.is_empty() {
                None
            } else {
                Some(event.notes.clone())
            },
            location: event.location.clone(),
            url: event.url.as_ref().map(Url::to_string),
            alarm_minutes: event.alarms.first().copied(),
        }
    }
}
