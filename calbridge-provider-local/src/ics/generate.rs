//! ICS file generation.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use icalendar::{Alarm, Calendar, Component, EventLike, Trigger};

use crate::store::NativeEvent;

/// Custom property recording which calendar the event belongs to
pub const CALENDAR_PROPERTY: &str = "X-CALBRIDGE-CALENDAR";

/// Generate .ics content for a saved event
pub fn generate_ics(event: &NativeEvent, tz: Tz) -> Result<String> {
    let id = event
        .id
        .as_deref()
        .context("Event must have an id before it is written")?;

    let mut cal = Calendar::new();

    let mut ics_event = icalendar::Event::new();
    ics_event.uid(id);
    ics_event.summary(&event.title);

    // DTSTAMP - required by RFC 5545
    let dtstamp = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
    ics_event.add_property("DTSTAMP", &dtstamp);

    ics_event.add_property("DTSTART", wall_clock(event.start, tz));
    ics_event.add_property("DTEND", wall_clock(event.end, tz));

    if !event.notes.is_empty() {
        ics_event.description(&event.notes);
    }

    if let Some(ref loc) = event.location {
        ics_event.location(loc);
    }

    if let Some(ref url) = event.url {
        ics_event.add_property("URL", url.as_str());
    }

    for minutes in &event.alarms {
        let trigger = Trigger::before_start(chrono::Duration::minutes(*minutes));
        let alarm = Alarm::display("Reminder", trigger);
        ics_event.alarm(alarm);
    }

    ics_event.add_property(CALENDAR_PROPERTY, &event.calendar);

    let ics_event = ics_event.done();
    cal.push(ics_event);
    let cal = cal.done();

    Ok(strip_ics_bloat(&cal.to_string()))
}

/// Floating datetime (no Z, no TZID) in `tz`
fn wall_clock(instant: DateTime<Utc>, tz: Tz) -> String {
    instant
        .with_timezone(&tz)
        .naive_local()
        .format("%Y%m%dT%H%M%S")
        .to_string()
}

/// Clean up ICS output from the icalendar crate
/// - Replace PRODID with CALBRIDGE
/// - Remove CALSCALE:GREGORIAN (it's the default)
/// - Remove DTSTAMP and UID inside VALARM sections (not required by RFC 5545)
fn strip_ics_bloat(ics: &str) -> String {
    let mut result = String::with_capacity(ics.len());
    let mut in_valarm = false;

    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str("PRODID:CALBRIDGE\r\n");
            continue;
        }

        if line == "CALSCALE:GREGORIAN" {
            continue;
        }

        if line == "BEGIN:VALARM" {
            in_valarm = true;
        } else if line == "END:VALARM" {
            in_valarm = false;
        }

        if in_valarm && (line.starts_with("DTSTAMP:") || line.starts_with("UID:")) {
            continue;
        }

        result.push_str(line);
        result.push_str("\r\n");
    }

    result
}
