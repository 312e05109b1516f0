use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Device timestamps are whole seconds, truncated to 32 bits.
pub fn epoch_seconds(at: DateTime<Utc>) -> i32 {
    (at.timestamp_millis() / 1000) as i32
}
