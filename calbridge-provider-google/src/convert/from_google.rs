use anyhow::{Result, bail};
use calbridge_core::EventModel;
use chrono::{DateTime, Utc};
use google_calendar::types::{Event, EventDateTime};

pub trait FromGoogle {
    fn from_google(event: Event) -> Result<Self>
    where
        Self: Sized;
}

impl FromGoogle for EventModel {
    fn from_google(event: Event) -> Result<Self> {
        let Some(start) = event.start.as_ref().and_then(google_to_instant) else {
            bail!("Event {} has no start time", event.id);
        };
        let Some(end) = event.end.as_ref().and_then(google_to_instant) else {
            bail!("Event {} has no end time", event.id);
        };

        Ok(EventModel {
            id: if event.id.is_empty() {
                None
            } else {
                Some(event.id)
            },
            start,
            end,
            title: event.summary,
            description: if event.description.is_empty() {
                None
            } else {
                Some(event.description)
            },
            location: None,
            url: None,
            alarm_minutes: None,
        })
    }
}

/// All-day dates are read as midnight UTC.
fn google_to_instant(time: &EventDateTime) -> Option<DateTime<Utc>> {
    if let Some(dt) = time.date_time {
        return Some(dt);
    }
    time.date
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
