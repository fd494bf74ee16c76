//! Time and timestamp helpers.
//!
//! Timestamps are stored in UTC. Habits, however, live on the local wall
//! clock, so weekday and time-of-day are derived through a [`Calendar`]
//! carrying the household's UTC offset.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Offset, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// UTC timestamp used for event times, pattern bounds, decisions, etc.
pub type Timestamp = DateTime<Utc>;

/// Number of minutes on the 24h clock.
pub const MINUTES_PER_DAY: f64 = 1440.0;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// `ts + by`, clamped to the representable range instead of overflowing.
#[must_use]
pub fn saturating_add(ts: Timestamp, by: Duration) -> Timestamp {
    ts.checked_add_signed(by).unwrap_or(if by < Duration::zero() {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}

/// `ts - by`, clamped to the representable range instead of overflowing.
#[must_use]
pub fn saturating_sub(ts: Timestamp, by: Duration) -> Timestamp {
    ts.checked_sub_signed(by).unwrap_or(if by < Duration::zero() {
        DateTime::<Utc>::MAX_UTC
    } else {
        DateTime::<Utc>::MIN_UTC
    })
}

/// Maps UTC timestamps onto the local wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    offset: FixedOffset,
}

impl Default for Calendar {
    fn default() -> Self {
        Self::utc()
    }
}

impl Calendar {
    /// A calendar whose local time is UTC.
    #[must_use]
    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    /// A calendar shifted by `minutes` east of UTC.
    ///
    /// Offsets outside ±24h fall back to UTC.
    #[must_use]
    pub fn with_offset_minutes(minutes: i32) -> Self {
        FixedOffset::east_opt(minutes.saturating_mul(60))
            .map_or_else(Self::utc, |offset| Self { offset })
    }

    /// Local weekday of `ts`.
    #[must_use]
    pub fn weekday(&self, ts: Timestamp) -> Weekday {
        ts.with_timezone(&self.offset).weekday()
    }

    /// Local hour of `ts`, `0..24`.
    #[must_use]
    pub fn hour(&self, ts: Timestamp) -> u32 {
        ts.with_timezone(&self.offset).hour()
    }

    /// Local time of day of `ts`, in minutes since midnight (fractional).
    #[must_use]
    pub fn minute_of_day(&self, ts: Timestamp) -> f64 {
        let local = ts.with_timezone(&self.offset);
        f64::from(local.num_seconds_from_midnight()) / 60.0
    }
}

/// A half-open `[start, end)` range of time used for event queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeWindow {
    /// The window covering `span` up to (and excluding) `end`.
    #[must_use]
    pub fn ending_at(end: Timestamp, span: Duration) -> Self {
        Self {
            start: saturating_sub(end, span),
            end,
        }
    }

    /// Whether `ts` falls inside the window.
    #[must_use]
    pub fn contains(&self, ts: Timestamp) -> bool {
        ts >= self.start && ts < self.end
    }
}

/// Format minutes-since-midnight as `HH:MM:SS`.
#[must_use]
pub fn format_minute_of_day(minute: f64) -> String {
    let total_seconds = (minute.rem_euclid(MINUTES_PER_DAY) * 60.0).round();
    // bounded by 86_400, so the cast is lossless
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total_seconds = total_seconds as u32 % 86_400;
    format!(
        "{:02}:{:02}:{:02}",
        total_seconds / 3600,
        (total_seconds / 60) % 60,
        total_seconds % 60
    )
}
