//! A calendar store backed by a directory of .ics files.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use calbridge_core::auth::AuthorizationStatus;
use calbridge_core::date_range::DateRange;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::ics::{generate_ics, parse_event};
use crate::store::{CalendarStore, NativeEvent};

/// One .ics file per event, named after the event id.
///
/// Permission follows the directory: a writable directory is authorized, a
/// read-only one denied, a non-directory path restricted. A missing
/// directory is undetermined until an access request creates it.
pub struct DirectoryStore {
    dir: PathBuf,
    tz: Tz,
    create_if_missing: bool,
}

impl DirectoryStore {
    pub fn new(dir: impl Into<PathBuf>, tz: Tz) -> Self {
        DirectoryStore {
            dir: dir.into(),
            tz,
            create_if_missing: true,
        }
    }

    /// Whether an access request may create the directory (default: yes).
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    fn event_path(&self, id: &str) -> PathBuf {
        let safe_id = id.replace(['/', '\\', ':'], "_");
        self.dir.join(format!("{}.ics", safe_id))
    }

    async fn read_event(&self, path: &Path) -> Option<NativeEvent> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable event file");
                return None;
            }
        };

        let event = parse_event(&content, self.tz, &self.default_calendar());
        if event.is_none() {
            tracing::warn!(path = %path.display(), "skipping unparseable event file");
        }
        event
    }
}

#[async_trait]
impl CalendarStore for DirectoryStore {
    fn authorization_status(&self) -> AuthorizationStatus {
        match std::fs::metadata(&self.dir) {
            Ok(meta) if !meta.is_dir() => AuthorizationStatus::Restricted,
            Ok(meta) if meta.permissions().readonly() => AuthorizationStatus::Denied,
            Ok(_) => AuthorizationStatus::Authorized,
            Err(e) if e.kind() == ErrorKind::NotFound => AuthorizationStatus::NotDetermined,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => AuthorizationStatus::Denied,
            Err(_) => AuthorizationStatus::Restricted,
        }
    }

    async fn request_access(&self) -> Result<bool> {
        if !self.create_if_missing {
            return Ok(false);
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create calendar directory {}", self.dir.display()))?;

        Ok(true)
    }

    fn default_calendar(&self) -> String {
        self.dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("calendar")
            .to_string()
    }

    async fn events(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<NativeEvent>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("Failed to read calendar directory {}", self.dir.display()))?;

        let range = DateRange::new(from, to);
        let mut events = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|e| e != "ics") {
                continue;
            }

            if let Some(event) = self.read_event(&path).await
                && range.overlaps(event.start, event.end)
            {
                events.push(event);
            }
        }

        // Directory order is arbitrary; keep listings stable
        events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));

        Ok(events)
    }

    async fn save(&self, mut event: NativeEvent) -> Result<NativeEvent> {
        let id = event
            .id
            .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
            .clone();

        let content = generate_ics(&event, self.tz)?;
        let path = self.event_path(&id);

        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write event to {}", path.display()))?;

        Ok(event)
    }

    async fn remove(&self, event: &NativeEvent) -> Result<()> {
        let Some(id) = &event.id else {
            bail!("Cannot remove an event that was never saved");
        };

        let path = self.event_path(id);
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("Failed to remove event file {}", path.display()))
    }
}
