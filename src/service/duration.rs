use chrono::{DateTime, Utc};

/// Elapsed session time in milliseconds, clamped at zero.
///
/// A checkout earlier than its check-in is a clock anomaly and yields `0`.
/// Returns `None` when either end of the session is missing.
pub fn session_duration(checkin: Option<DateTime<Utc>>, checkout: Option<DateTime<Utc>>) -> Option<i64> {
    let (checkin, checkout) = (checkin?, checkout?);
    Some((checkout - checkin).num_milliseconds().max(0))
}
