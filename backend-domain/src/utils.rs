use chrono::{DateTime, Utc};

pub fn current_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn millis_to_utc(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_else(Utc::now)
}

/// Current time truncated to millisecond precision, matching what the store keeps.
pub fn utc_now() -> DateTime<Utc> {
    millis_to_utc(current_millis())
}
