//! ICS file parsing using the icalendar crate's parser.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{read_calendar, unfold},
};
use url::Url;

use super::generate::CALENDAR_PROPERTY;
use crate::store::NativeEvent;

/// Parse ICS content into a NativeEvent, reading floating times in `tz`
pub fn parse_event(content: &str, tz: Tz, default_calendar: &str) -> Option<NativeEvent> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).ok()?;
    let vevent = calendar.components.iter().find(|c| c.name == "VEVENT")?;

    let id = vevent.find_prop("UID")?.val.to_string();
    let title = vevent
        .find_prop("SUMMARY")
        .map(|p| unescape(p.val.as_ref()))
        .unwrap_or_default();
    let start = to_utc(DatePerhapsTime::try_from(vevent.find_prop("DTSTART")?).ok()?, tz)?;
    let end = to_utc(DatePerhapsTime::try_from(vevent.find_prop("DTEND")?).ok()?, tz)?;

    let notes = vevent
        .find_prop("DESCRIPTION")
        .map(|p| unescape(p.val.as_ref()))
        .unwrap_or_default();
    let location = vevent
        .find_prop("LOCATION")
        .map(|p| unescape(p.val.as_ref()));
    let url = vevent
        .find_prop("URL")
        .and_then(|p| Url::parse(p.val.as_ref()).ok());
    let calendar = vevent
        .find_prop(CALENDAR_PROPERTY)
        .map(|p| p.val.to_string())
        .unwrap_or_else(|| default_calendar.to_string());

    let alarms: Vec<i64> = vevent
        .components
        .iter()
        .filter(|c| c.name == "VALARM")
        .filter_map(|alarm| {
            let trigger = alarm.find_prop("TRIGGER")?.val.as_ref();
            parse_trigger_minutes(trigger)
        })
        .collect();

    Some(NativeEvent {
        id: Some(id),
        title,
        notes,
        start,
        end,
        location,
        url,
        alarms,
        calendar,
    })
}

/// Resolve a DTSTART/DTEND value to an instant. Floating times and dates are
/// read as wall-clock in `tz`.
fn to_utc(dpt: DatePerhapsTime, tz: Tz) -> Option<DateTime<Utc>> {
    match dpt {
        DatePerhapsTime::Date(d) => local_to_utc(d.and_hms_opt(0, 0, 0)?, tz),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            CalendarDateTime::Utc(dt) => Some(dt),
            CalendarDateTime::Floating(naive) => local_to_utc(naive, tz),
            CalendarDateTime::WithTimezone { date_time, tzid } => {
                let zone = tzid.parse::<Tz>().unwrap_or(tz);
                local_to_utc(date_time, zone)
            }
        },
    }
}

/// Wall-clock times inside a DST gap do not exist; they resolve to the
/// earliest valid reading when ambiguous and are skipped when missing.
fn local_to_utc(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Undo RFC 5545 text escaping
fn unescape(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => result.push('\n'),
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }

    result
}

/// Parse TRIGGER value to minutes before event (-PT30M, -P1D, etc.)
fn parse_trigger_minutes(value: &str) -> Option<i64> {
    let is_before = value.starts_with('-');
    let duration_str = value.trim_start_matches('-');

    let duration = iso8601::duration(duration_str).ok()?;
    let std_duration: std::time::Duration = duration.into();
    let minutes = (std_duration.as_secs() / 60) as i64;

    Some(if is_before { minutes } else { -minutes })
}
