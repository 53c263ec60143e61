//! `CalendarService` backed by the Google Calendar API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use calbridge_core::config::RemoteSettings;
use calbridge_core::date_range::DateRange;
use google_calendar::Client;
use google_calendar::types::{Event, OrderBy, SendUpdates};

use super::retry::RetryPolicy;
use crate::auth::Session;
use crate::service::{CalendarService, ServiceFactory, ServiceResponse};

pub struct GoogleCalendarService {
    client: Client,
    retry: RetryPolicy,
}

impl GoogleCalendarService {
    pub fn new(client: Client, retry: RetryPolicy) -> Self {
        GoogleCalendarService { client, retry }
    }
}

#[async_trait]
impl CalendarService for GoogleCalendarService {
    async fn insert(&self, calendar_id: &str, event: &Event) -> Result<ServiceResponse<Event>> {
        let client = &self.client;

        let response = self
            .retry
            .run("insert event", move || async move {
                client
                    .events()
                    .insert(calendar_id, 0, 0, false, SendUpdates::None, false, event)
                    .await
                    .with_context(|| format!("Failed to create event: {}", event.summary))
            })
            .await?;

        Ok(ServiceResponse::new(response.status.as_u16(), response.body))
    }

    async fn list(
        &self,
        calendar_id: &str,
        range: Option<&DateRange>,
    ) -> Result<ServiceResponse<Vec<Event>>> {
        let client = &self.client;
        let time_min = range.map(|r| r.from.to_rfc3339()).unwrap_or_default();
        let time_max = range.map(|r| r.to.to_rfc3339()).unwrap_or_default();
        let (time_min, time_max) = (time_min.as_str(), time_max.as_str());

        let response = self
            .retry
            .run("list events", move || async move {
                client
                    .events()
                    .list_all(
                        calendar_id,
                        "",
                        0,
                        OrderBy::default(),
                        &[],
                        "", // search query
                        &[],
                        false,
                        false,
                        false,
                        time_max,
                        time_min,
                        "",
                        "",
                    )
                    .await
                    .context("Failed to fetch events")
            })
            .await?;

        Ok(ServiceResponse::new(response.status.as_u16(), response.body))
    }

    async fn delete(&self, calendar_id: &str, event_id: &str) -> Result<ServiceResponse<()>> {
        let client = &self.client;

        let response = self
            .retry
            .run("delete event", move || async move {
                client
                    .events()
                    .delete(calendar_id, event_id, false, SendUpdates::None)
                    .await
                    .with_context(|| format!("Failed to delete event: {}", event_id))
            })
            .await?;

        Ok(ServiceResponse::new(response.status.as_u16(), ()))
    }
}

/// Builds `GoogleCalendarService`s from signed-in sessions.
pub struct GoogleServiceFactory {
    client_secret: String,
    max_retry_interval: Duration,
}

impl GoogleServiceFactory {
    pub fn new(client_secret: impl Into<String>, max_retry_interval: Duration) -> Self {
        GoogleServiceFactory {
            client_secret: client_secret.into(),
            max_retry_interval,
        }
    }

    pub fn from_settings(settings: &RemoteSettings) -> Self {
        Self::new(
            settings.client_secret.clone().unwrap_or_default(),
            settings.max_retry_interval(),
        )
    }
}

impl ServiceFactory for GoogleServiceFactory {
    fn build(&self, session: &Session, client_id: &str) -> Option<Arc<dyn CalendarService>> {
        if session.access_token.is_empty() {
            return None;
        }

        let client = Client::new(
            client_id.to_string(),
            self.client_secret.clone(),
            String::new(),
            session.access_token.clone(),
            session.refresh_token.clone(),
        );

        Some(Arc::new(GoogleCalendarService::new(
            client,
            RetryPolicy::new(self.max_retry_interval),
        )))
    }
}
