//! Date range for filtering events.

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Default search window used when removing an event: one year either side
/// of now.
pub const DEFAULT_REMOVAL_WINDOW_DAYS: i64 = 365;

/// Closed interval of instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        DateRange { from, to }
    }

    /// `days` either side of `now`.
    pub fn around(now: DateTime<Utc>, days: i64) -> Self {
        DateRange {
            from: now - Duration::days(days),
            to: now + Duration::days(days),
        }
    }

    /// Window searched by removals when the caller gives none.
    pub fn default_removal_window() -> Self {
        Self::around(Utc::now(), DEFAULT_REMOVAL_WINDOW_DAYS)
    }

    pub fn is_valid(&self) -> bool {
        self.from <= self.to
    }

    /// Whether an event spanning `start..=end` touches this range.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start <= self.to && end >= self.from
    }

    /// Range from optional YYYY-MM-DD bounds. A missing bound falls back to
    /// the default window; `to` covers its whole day.
    pub fn from_args(from: Option<&str>, to: Option<&str>) -> Result<Self, String> {
        let default = Self::default_removal_window();

        let from = match from {
            Some(s) => parse_date_start(s)?,
            None => default.from,
        };
        let to = match to {
            Some(s) => parse_date_end(s)?,
            None => default.to,
        };

        let range = DateRange { from, to };
        if !range.is_valid() {
            return Err(format!("Range start {} is after its end {}", from, to));
        }
        Ok(range)
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date format '{}'. Expected YYYY-MM-DD", s))
}

/// Parse YYYY-MM-DD as start of day in UTC
fn parse_date_start(s: &str) -> Result<DateTime<Utc>, String> {
    Ok(parse_date(s)?.and_time(chrono::NaiveTime::MIN).and_utc())
}

/// Parse YYYY-MM-DD as end of day in UTC
fn parse_date_end(s: &str) -> Result<DateTime<Utc>, String> {
    let next_day = parse_date(s)?
        .succ_opt()
        .ok_or_else(|| format!("Date '{}' is out of range", s))?;
    Ok(next_day.and_time(chrono::NaiveTime::MIN).and_utc() - Duration::seconds(1))
}
