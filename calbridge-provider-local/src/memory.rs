//! In-process calendar store.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use calbridge_core::auth::AuthorizationStatus;
use calbridge_core::date_range::DateRange;
use chrono::{DateTime, Utc};

use crate::store::{CalendarStore, NativeEvent};

const MEMORY_CALENDAR: &str = "memory";

/// Keeps events in memory. Access requests resolve to a configured answer.
pub struct MemoryStore {
    status: Mutex<AuthorizationStatus>,
    grant_on_request: bool,
    request_delay: Option<Duration>,
    access_requests: AtomicUsize,
    events: Mutex<Vec<NativeEvent>>,
}

impl MemoryStore {
    pub fn new(status: AuthorizationStatus) -> Self {
        MemoryStore {
            status: Mutex::new(status),
            grant_on_request: true,
            request_delay: None,
            access_requests: AtomicUsize::new(0),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Answer given to access requests (default: granted).
    pub fn grant_on_request(mut self, grant: bool) -> Self {
        self.grant_on_request = grant;
        self
    }

    /// Time an access request takes to resolve, standing in for the user
    /// reading the prompt.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = Some(delay);
        self
    }

    /// Number of access requests issued so far.
    pub fn access_requests(&self) -> usize {
        self.access_requests.load(Ordering::SeqCst)
    }

    /// Snapshot of every stored event.
    pub fn all_events(&self) -> Vec<NativeEvent> {
        self.lock_events().clone()
    }

    fn lock_events(&self) -> std::sync::MutexGuard<'_, Vec<NativeEvent>> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn set_status(&self, status: AuthorizationStatus) {
        *self
            .status
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = status;
    }
}

#[async_trait]
impl CalendarStore for MemoryStore {
    fn authorization_status(&self) -> AuthorizationStatus {
        *self
            .status
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    async fn request_access(&self) -> Result<bool> {
        self.access_requests.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.request_delay {
            tokio::time::sleep(delay).await;
        }

        self.set_status(if self.grant_on_request {
            AuthorizationStatus::Authorized
        } else {
            AuthorizationStatus::Denied
        });

        Ok(self.grant_on_request)
    }

    fn default_calendar(&self) -> String {
        MEMORY_CALENDAR.to_string()
    }

    async fn events(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<NativeEvent>> {
        let range = DateRange::new(from, to);

        Ok(self
            .lock_events()
            .iter()
            .filter(|e| range.overlaps(e.start, e.end))
            .cloned()
            .collect())
    }

    async fn save(&self, mut event: NativeEvent) -> Result<NativeEvent> {
        if event.id.is_none() {
            event.id = Some(uuid::Uuid::new_v4().to_string());
        }

        let mut events = self.lock_events();
        events.retain(|e| e.id != event.id);
        events.push(event.clone());

        Ok(event)
    }

    async fn remove(&self, event: &NativeEvent) -> Result<()> {
        let Some(id) = &event.id else {
            bail!("Cannot remove an event that was never saved");
        };

        let mut events = self.lock_events();
        let before = events.len();
        events.retain(|e| e.id.as_ref() != Some(id));

        if events.len() == before {
            bail!("No event with id {} in store", id);
        }

        Ok(())
    }
}
