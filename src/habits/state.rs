use chrono::{DateTime, Utc};
use serde::Serialize;

use super::event::HabitEvent;
use crate::config::{FaceConfig, FaceIndex, HabitMode};
use crate::ports::clock::epoch_seconds;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Counting,
    Timing,
}

/// What the active face is doing. The habit id is copied at activation so a
/// session always reports under the id it started with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Activity {
    #[default]
    Idle,
    Counting {
        habit_id: String,
        count: u32,
    },
    Timing {
        habit_id: String,
        started_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub active_face: Option<FaceIndex>,
    pub activity: Activity,
    /// Bumped whenever the pending inactivity flush becomes obsolete.
    pub flush_generation: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> SessionStatus {
        match self.activity {
            Activity::Idle => SessionStatus::Idle,
            Activity::Counting { .. } => SessionStatus::Counting,
            Activity::Timing { .. } => SessionStatus::Timing,
        }
    }

    pub fn count(&self) -> u32 {
        match self.activity {
            Activity::Counting { count, .. } => count,
            _ => 0,
        }
    }

    /// Enter the session for `face` according to its configuration.
    pub fn activate(&mut self, face: FaceIndex, config: &FaceConfig, now: DateTime<Utc>) {
        self.active_face = Some(face);
        self.flush_generation = self.flush_generation.wrapping_add(1);
        self.activity = if !config.is_configured() {
            Activity::Idle
        } else {
            match config.mode {
                HabitMode::Counter => Activity::Counting {
                    habit_id: config.habit_id.clone(),
                    count: 0,
                },
                HabitMode::Timer => Activity::Timing {
                    habit_id: config.habit_id.clone(),
                    started_at: now,
                },
                HabitMode::Unset => Activity::Idle,
            }
        };
    }

    /// Count one impact. Returns `false` when the active face is not counting.
    pub fn record_impact(&mut self) -> bool {
        match &mut self.activity {
            Activity::Counting { count, .. } => {
                *count = count.saturating_add(1);
                self.flush_generation = self.flush_generation.wrapping_add(1);
                true
            }
            _ => false,
        }
    }

    /// Finalize the running session into an event.
    ///
    /// Counting resets to zero and stays on the same face; a zero count
    /// produces nothing. Timing always produces an event and its clock
    /// restarts at `now`.
    pub fn flush(&mut self, now: DateTime<Utc>) -> Option<HabitEvent> {
        match &mut self.activity {
            Activity::Idle => None,
            Activity::Counting { habit_id, count } => {
                if *count == 0 {
                    return None;
                }
                let total = i32::try_from(*count).unwrap_or(i32::MAX);
                *count = 0;
                Some(HabitEvent::count(habit_id.clone(), total, epoch_seconds(now)))
            }
            Activity::Timing {
                habit_id,
                started_at,
            } => {
                let event =
                    HabitEvent::duration(habit_id.clone(), epoch_seconds(*started_at), epoch_seconds(now));
                *started_at = now;
                Some(event)
            }
        }
    }

    /// Flush and drop the active face entirely.
    pub fn end(&mut self, now: DateTime<Utc>) -> Option<HabitEvent> {
        let event = self.flush(now);
        self.active_face = None;
        self.activity = Activity::Idle;
        self.flush_generation = self.flush_generation.wrapping_add(1);
        event
    }
}
