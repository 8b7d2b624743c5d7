//! Time utility functions
//!
//! Event timestamps are epoch milliseconds, interpreted as UTC. The warehouse
//! derives its time dimension in SQL; these helpers compute the same fields
//! client-side.

use chrono::{DateTime, Datelike, Timelike, Utc};

/// Convert milliseconds since Unix epoch to DateTime<Utc>
pub fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(|| {
        tracing::warn!(millis, "Invalid timestamp, using epoch");
        DateTime::UNIX_EPOCH
    })
}

/// Render the way the SQLite warehouse stores timestamps
pub fn format_warehouse_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

/// Calendar fields of the time dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarParts {
    pub hour: i64,
    pub day: i64,
    /// ISO 8601 week number
    pub week: i64,
    pub month: i64,
    pub year: i64,
    /// 0 = Sunday
    pub weekday: i64,
}

impl CalendarParts {
    pub fn from_datetime(dt: &DateTime<Utc>) -> Self {
        Self {
            hour: i64::from(dt.hour()),
            day: i64::from(dt.day()),
            week: i64::from(dt.iso_week().week()),
            month: i64::from(dt.month()),
            year: i64::from(dt.year()),
            weekday: i64::from(dt.weekday().num_days_from_sunday()),
        }
    }

    pub fn from_epoch_millis(millis: i64) -> Self {
        Self::from_datetime(&millis_to_datetime(millis))
    }
}
