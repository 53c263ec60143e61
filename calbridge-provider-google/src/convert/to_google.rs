use calbridge_core::EventModel;
use chrono::{DateTime, Utc};
use google_calendar::types::{Event, EventDateTime};

pub trait ToGoogle {
    fn to_google(&self) -> Event;
}

/// Title, description, start and end carry over. Location, URL and alarm
/// stay with the local backend.
impl ToGoogle for EventModel {
    fn to_google(&self) -> Event {
        Event {
            id: self.id.clone().unwrap_or_default(),
            summary: self.title.clone(),
            description: self.description.clone().unwrap_or_default(),
            start: Some(instant_to_google(self.start)),
            end: Some(instant_to_google(self.end)),
            ..Default::default()
        }
    }
}

fn instant_to_google(instant: DateTime<Utc>) -> EventDateTime {
    EventDateTime {
        date: None,
        date_time: Some(instant),
        time_zone: String::new(),
    }
}
