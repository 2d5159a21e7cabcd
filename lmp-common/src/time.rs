//! Timestamp utilities

use chrono::{DateTime, Utc};
use std::time::SystemTime;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current UTC timestamp as an RFC 3339 string with millisecond precision
pub fn now_rfc3339() -> String {
    to_rfc3339(now())
}

/// Format a timestamp the way the JSON API reports times
pub fn to_rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Convert a filesystem modification time to UTC
pub fn from_system_time(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}
