use serde::{Deserialize, Serialize};

/// A finished session, ready to report.
///
/// Field order is the wire order of the binary record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitEvent {
    /// Seconds since the epoch when the session was flushed.
    pub device_timestamp: i32,
    pub habit_id: String,
    pub measurement: Measurement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Measurement {
    Count(i32),
    Duration {
        start_timestamp: i32,
        stop_timestamp: i32,
    },
}

impl HabitEvent {
    pub fn count(habit_id: impl Into<String>, count: i32, device_timestamp: i32) -> Self {
        Self {
            device_timestamp,
            habit_id: habit_id.into(),
            measurement: Measurement::Count(count),
        }
    }

    pub fn duration(habit_id: impl Into<String>, start_timestamp: i32, stop_timestamp: i32) -> Self {
        Self {
            device_timestamp: stop_timestamp,
            habit_id: habit_id.into(),
            measurement: Measurement::Duration {
                start_timestamp,
                stop_timestamp,
            },
        }
    }

    /// Compact binary record sent upstream.
    pub fn encode(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}
