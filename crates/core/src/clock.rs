//! Time helpers for object timestamps.

use time::{OffsetDateTime, Time};

/// Truncate to the start of the current hour in UTC.
pub fn truncate_to_hour(t: OffsetDateTime) -> OffsetDateTime {
    let t = t.to_offset(time::UtcOffset::UTC);
    t.replace_time(Time::MIDNIGHT).replace_hour(t.hour()).unwrap_or(t)
}

/// Truncate to whole seconds.
pub fn truncate_to_seconds(t: OffsetDateTime) -> OffsetDateTime {
    t.replace_nanosecond(0).unwrap_or(t)
}
