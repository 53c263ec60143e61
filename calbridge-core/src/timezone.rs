//! Daylight-saving correction for local-store writes.
//!
//! The local store renders instants as wall-clock components. When "now" and
//! an event's start or end fall on different sides of a DST transition the
//! stored wall-clock is off by one hour, so writes shift the affected instant
//! by an hour toward the offset that is in effect now.

use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::{OffsetComponents, Tz};

const DST_SHIFT_MINUTES: i64 = 60;

/// Corrects start/end instants for DST discontinuities in a time zone.
#[derive(Debug, Clone, Copy)]
pub struct DstAdjuster {
    tz: Tz,
    now: fn() -> DateTime<Utc>,
}

impl DstAdjuster {
    pub fn new(tz: Tz) -> Self {
        DstAdjuster { tz, now: Utc::now }
    }

    /// Use `now` instead of the system clock as the current moment.
    pub fn with_clock(mut self, now: fn() -> DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Whether daylight-saving time is in effect at `instant`.
    pub fn is_daylight_saving(&self, instant: DateTime<Utc>) -> bool {
        let offset = self.tz.offset_from_utc_datetime(&instant.naive_utc());
        offset.dst_offset() != Duration::zero()
    }

    /// Adjust `start` and `end` relative to the current moment.
    pub fn adjust(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        self.adjust_at((self.now)(), start, end)
    }

    /// Adjust `start` and `end` as if the current moment were `now`.
    pub fn adjust_at(
        &self,
        now: DateTime<Utc>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        let shift = Duration::minutes(DST_SHIFT_MINUTES);
        let now_is_summer = self.is_daylight_saving(now);
        let start_is_summer = self.is_daylight_saving(start);
        let end_is_summer = self.is_daylight_saving(end);

        let mut start = start;
        let mut end = end;

        if !now_is_summer {
            if start_is_summer {
                start -= shift;
            }
            if end_is_summer {
                end -= shift;
            }
        } else {
            if !start_is_summer {
                start += shift;
            }
            if !end_is_summer {
                end += shift;
            }
        }

        (start, end)
    }
}
