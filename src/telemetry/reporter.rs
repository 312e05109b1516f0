use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::{ConfigSnapshot, ConfigVersion};
use crate::error::ReportError;
use crate::habits::HabitEvent;
use crate::ports::Transport;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TelemetryConfig {
    pub event_topic: String,
    pub snapshot_topic: String,
    pub config_topic: String,
    /// Seconds between unsolicited configuration snapshots. 0 disables them.
    pub snapshot_interval_secs: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            event_topic: "facetrack/events".into(),
            snapshot_topic: "facetrack/shadow/update".into(),
            config_topic: "facetrack/config".into(),
            snapshot_interval_secs: 3600,
        }
    }
}

#[derive(Serialize)]
struct ShadowUpdate<'a> {
    state: ReportedState<'a>,
}

#[derive(Serialize)]
struct ReportedState<'a> {
    reported: Option<&'a ConfigSnapshot>,
}

/// `{"state":{"reported":{..}}}`, with `reported: null` when no face is
/// configured.
pub fn snapshot_document(snapshot: &ConfigSnapshot) -> Result<Vec<u8>, serde_json::Error> {
    let document = ShadowUpdate {
        state: ReportedState {
            reported: (!snapshot.is_empty()).then_some(snapshot),
        },
    };
    serde_json::to_vec(&document)
}

/// Encodes finished sessions and configuration snapshots and hands them to
/// the transport. Failures are returned as-is; nothing is queued or retried.
pub struct EventReporter<T> {
    transport: T,
    event_topic: String,
    snapshot_topic: String,
}

impl<T: Transport> EventReporter<T> {
    pub fn new(transport: T, config: &TelemetryConfig) -> Self {
        Self {
            transport,
            event_topic: config.event_topic.clone(),
            snapshot_topic: config.snapshot_topic.clone(),
        }
    }

    pub async fn emit(&self, event: &HabitEvent) -> Result<(), ReportError> {
        let payload = event.encode()?;
        debug!(
            "Publishing habit event for '{}' ({} bytes)",
            event.habit_id,
            payload.len()
        );
        self.transport.send(&self.event_topic, payload).await?;
        Ok(())
    }

    pub async fn emit_snapshot(
        &self,
        version: ConfigVersion,
        snapshot: &ConfigSnapshot,
    ) -> Result<(), ReportError> {
        let payload = snapshot_document(snapshot)?;
        self.transport.send(&self.snapshot_topic, payload).await?;
        info!(
            "Reported configuration version {} ({} configured faces)",
            version,
            snapshot.len()
        );
        Ok(())
    }
}
