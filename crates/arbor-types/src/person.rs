use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Author or committer of a commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub email: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    /// Offset from UTC in minutes at the time of signing.
    pub tz_offset_minutes: i32,
}

impl Person {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        timestamp_ms: i64,
        tz_offset_minutes: i32,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            timestamp_ms,
            tz_offset_minutes,
        }
    }

    /// Stamp an identity with the current local time.
    pub fn now(name: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Local::now();
        Self::new(
            name,
            email,
            now.timestamp_millis(),
            now.offset().local_minus_utc() / 60,
        )
    }

    pub fn when(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp_ms)
    }
}
