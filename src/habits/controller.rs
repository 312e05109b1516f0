use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use tokio::{sync::Mutex, task::JoinHandle};

use super::{Activity, HabitEvent, SessionState, SessionStatus};
use crate::config::{FaceIndex, FaceLookup, HabitMode};
use crate::error::ReportError;
use crate::ports::{Clock, Transport};
use crate::telemetry::EventReporter;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    /// Inactivity after the last impact before a burst is reported.
    pub flush_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            flush_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub active_face: Option<FaceIndex>,
    pub status: SessionStatus,
    pub habit_id: Option<String>,
    pub count: u32,
    pub started_at: Option<DateTime<Utc>>,
}

/// Drives the per-device session from face changes and impacts.
///
/// The orientation loop and the impact path both go through `state`. Lock
/// order is `state` then `flush_timer`; the timer task only takes `flush_timer`
/// while it holds `state`.
pub struct HabitController<T> {
    state: Arc<Mutex<SessionState>>,
    faces: Arc<dyn FaceLookup>,
    reporter: Arc<EventReporter<T>>,
    clock: Arc<dyn Clock>,
    flush_timer: Arc<Mutex<Option<JoinHandle<()>>>>,
    flush_timeout: Duration,
}

impl<T> Clone for HabitController<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            faces: self.faces.clone(),
            reporter: self.reporter.clone(),
            clock: self.clock.clone(),
            flush_timer: self.flush_timer.clone(),
            flush_timeout: self.flush_timeout,
        }
    }
}

impl<T: Transport> HabitController<T> {
    pub fn new(
        faces: Arc<dyn FaceLookup>,
        reporter: Arc<EventReporter<T>>,
        clock: Arc<dyn Clock>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new())),
            faces,
            reporter,
            clock,
            flush_timer: Arc::new(Mutex::new(None)),
            flush_timeout: Duration::from_millis(config.flush_timeout_ms),
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        let (habit_id, started_at) = match &state.activity {
            Activity::Idle => (None, None),
            Activity::Counting { habit_id, .. } => (Some(habit_id.clone()), None),
            Activity::Timing {
                habit_id,
                started_at,
            } => (Some(habit_id.clone()), Some(*started_at)),
        };
        SessionSnapshot {
            active_face: state.active_face,
            status: state.status(),
            habit_id,
            count: state.count(),
            started_at,
        }
    }

    /// A face was classified as up. Re-reporting the active face is a no-op.
    ///
    /// The transition is committed before reporting; `Err` means the flushed
    /// event could not be sent.
    pub async fn on_face(&self, face: FaceIndex) -> Result<Option<HabitEvent>, ReportError> {
        let event = {
            let mut state = self.state.lock().await;
            if state.active_face == Some(face) {
                return Ok(None);
            }

            let now = self.clock.now();
            let event = state.flush(now);
            let config = self.faces.face(face);
            state.activate(face, &config, now);
            self.cancel_flush_timer().await;

            info!(
                "Face {} up: {:?} ({})",
                face,
                state.status(),
                if config.is_configured() {
                    config.habit_id.as_str()
                } else {
                    "unconfigured"
                }
            );
            event
        };

        self.report(event).await
    }

    /// An impact was detected. Returns whether it was counted.
    pub async fn record_impact(&self) -> bool {
        let mut state = self.state.lock().await;
        if !state.record_impact() {
            debug!("Impact ignored: active face is not counting");
            return false;
        }

        let generation = state.flush_generation;
        debug!("Impact counted, burst total {}", state.count());
        self.arm_flush_timer(generation).await;
        true
    }

    /// Face configuration changed. If the active face now maps to a different
    /// habit or mode, its running session is closed and restarted.
    pub async fn on_config_changed(&self) -> Result<Option<HabitEvent>, ReportError> {
        let event = {
            let mut state = self.state.lock().await;
            let Some(face) = state.active_face else {
                return Ok(None);
            };

            let config = self.faces.face(face);
            if session_matches(&state.activity, config.is_configured(), &config.habit_id, config.mode) {
                return Ok(None);
            }

            let now = self.clock.now();
            let event = state.flush(now);
            state.activate(face, &config, now);
            self.cancel_flush_timer().await;
            info!("Face {face} reconfigured: {:?}", state.status());
            event
        };

        self.report(event).await
    }

    /// Flush whatever is running and forget the active face.
    pub async fn end_session(&self) -> Result<Option<HabitEvent>, ReportError> {
        let event = {
            let mut state = self.state.lock().await;
            self.cancel_flush_timer().await;
            state.end(self.clock.now())
        };

        self.report(event).await
    }

    async fn arm_flush_timer(&self, generation: u64) {
        let mut timer = self.flush_timer.lock().await;
        if let Some(handle) = timer.take() {
            handle.abort();
        }

        let controller = self.clone();
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(controller.flush_timeout).await;
            controller.flush_after_inactivity(generation).await;
        }));
    }

    async fn cancel_flush_timer(&self) {
        if let Some(handle) = self.flush_timer.lock().await.take() {
            handle.abort();
        }
    }

    async fn flush_after_inactivity(&self, generation: u64) {
        let event = {
            let mut state = self.state.lock().await;
            if state.flush_generation != generation {
                return;
            }
            // Detach this task so a rearm during the report cannot abort it.
            self.flush_timer.lock().await.take();
            state.flush(self.clock.now())
        };

        if let Some(event) = &event {
            info!("Inactivity flush for '{}'", event.habit_id);
        }
        if let Err(err) = self.report(event).await {
            error!("Failed to report inactivity flush: {err}");
        }
    }

    async fn report(&self, event: Option<HabitEvent>) -> Result<Option<HabitEvent>, ReportError> {
        match event {
            Some(event) => {
                self.reporter.emit(&event).await?;
                Ok(Some(event))
            }
            None => Ok(None),
        }
    }
}

fn session_matches(activity: &Activity, configured: bool, habit_id: &str, mode: HabitMode) -> bool {
    match activity {
        Activity::Idle => !configured,
        Activity::Counting { habit_id: current, .. } => {
            configured && mode == HabitMode::Counter && current == habit_id
        }
        Activity::Timing { habit_id: current, .. } => {
            configured && mode == HabitMode::Timer && current == habit_id
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FaceConfigStore, FaceUpdate};
    use crate::habits::Measurement;
    use crate::telemetry::TelemetryConfig;
    use crate::test_support::{ManualClock, MemoryStore, RecordingTransport};

    struct Harness {
        controller: HabitController<RecordingTransport>,
        store: Arc<FaceConfigStore<MemoryStore>>,
        transport: RecordingTransport,
        clock: ManualClock,
    }

    fn face(i: usize) -> FaceIndex {
        FaceIndex::new(i).unwrap()
    }

    async fn harness(entries: &[(usize, &str, HabitMode)]) -> Harness {
        let store = Arc::new(FaceConfigStore::load(MemoryStore::new()).await.unwrap());
        let updates: Vec<FaceUpdate> = entries
            .iter()
            .map(|(i, id, mode)| FaceUpdate {
                face: face(*i),
                habit_id: Some(id.to_string()),
                mode: Some(*mode),
            })
            .collect();
        store.apply_remote_config(&updates, 1).await.unwrap();

        let transport = RecordingTransport::new();
        let reporter = Arc::new(EventReporter::new(transport.clone(), &TelemetryConfig::default()));
        let clock = ManualClock::at_epoch_seconds(0);
        let controller = HabitController::new(
            store.clone(),
            reporter,
            Arc::new(clock.clone()),
            &SessionConfig::default(),
        );

        Harness {
            controller,
            store,
            transport,
            clock,
        }
    }

    impl Harness {
        fn events(&self) -> Vec<HabitEvent> {
            self.transport
                .sent_to("facetrack/events")
                .iter()
                .map(|bytes| HabitEvent::decode(bytes).unwrap())
                .collect()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_counter_burst_flushed_on_face_change() {
        let h = harness(&[(0, "h1", HabitMode::Counter)]).await;

        h.controller.on_face(face(0)).await.unwrap();
        for _ in 0..3 {
            assert!(h.controller.record_impact().await);
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        h.clock.set_epoch_seconds(50);
        let flushed = h.controller.on_face(face(5)).await.unwrap();

        assert_eq!(flushed, Some(HabitEvent::count("h1", 3, 50)));
        assert_eq!(h.events(), vec![HabitEvent::count("h1", 3, 50)]);
        assert_eq!(h.controller.snapshot().await.status, SessionStatus::Idle);

        // The pending inactivity flush was cancelled with the face change.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(h.events().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_reports_start_and_stop() {
        let h = harness(&[(1, "h2", HabitMode::Timer)]).await;

        h.clock.set_epoch_seconds(100);
        h.controller.on_face(face(1)).await.unwrap();
        h.clock.set_epoch_seconds(130);
        h.controller.on_face(face(2)).await.unwrap();

        let events = h.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].habit_id, "h2");
        assert_eq!(
            events[0].measurement,
            Measurement::Duration {
                start_timestamp: 100,
                stop_timestamp: 130
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_face_is_not_a_transition() {
        let h = harness(&[(1, "h2", HabitMode::Timer)]).await;

        h.controller.on_face(face(1)).await.unwrap();
        h.clock.set_epoch_seconds(40);
        assert_eq!(h.controller.on_face(face(1)).await.unwrap(), None);
        assert!(h.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_inactivity_flush_after_timeout() {
        let h = harness(&[(0, "h1", HabitMode::Counter)]).await;
        h.controller.on_face(face(0)).await.unwrap();

        h.controller.record_impact().await;
        h.controller.record_impact().await;
        h.clock.set_epoch_seconds(20);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(h.events().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(h.events(), vec![HabitEvent::count("h1", 2, 20)]);

        let snapshot = h.controller.snapshot().await;
        assert_eq!(snapshot.status, SessionStatus::Counting);
        assert_eq!(snapshot.count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_impact_rearms_the_timeout() {
        let h = harness(&[(0, "h1", HabitMode::Counter)]).await;
        h.controller.on_face(face(0)).await.unwrap();

        for _ in 0..4 {
            h.controller.record_impact().await;
            tokio::time::sleep(Duration::from_secs(3)).await;
        }
        assert!(h.events().is_empty());

        tokio::time::sleep(Duration::from_secs(3)).await;
        let events = h.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].measurement, Measurement::Count(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_empty_count_events() {
        let h = harness(&[(0, "h1", HabitMode::Counter), (1, "h3", HabitMode::Counter)]).await;

        h.controller.on_face(face(0)).await.unwrap();
        h.controller.on_face(face(1)).await.unwrap();
        h.controller.record_impact().await;
        tokio::time::sleep(Duration::from_secs(6)).await;
        h.controller.on_face(face(0)).await.unwrap();

        let events = h.events();
        assert_eq!(events.len(), 1);
        assert!(events
            .iter()
            .all(|e| e.measurement != Measurement::Count(0)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_impacts_on_idle_face_are_ignored() {
        let h = harness(&[]).await;
        assert!(!h.controller.record_impact().await);

        h.controller.on_face(face(3)).await.unwrap();
        assert!(!h.controller.record_impact().await);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(h.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_still_transitions() {
        let h = harness(&[(1, "h2", HabitMode::Timer)]).await;
        h.controller.on_face(face(1)).await.unwrap();

        h.transport.set_offline(true);
        let result = h.controller.on_face(face(4)).await;

        assert!(matches!(result, Err(ReportError::Transport(_))));
        let snapshot = h.controller.snapshot().await;
        assert_eq!(snapshot.active_face, Some(face(4)));
        assert_eq!(snapshot.status, SessionStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_config_change_restarts_active_session() {
        let h = harness(&[(2, "walk", HabitMode::Timer)]).await;
        h.clock.set_epoch_seconds(10);
        h.controller.on_face(face(2)).await.unwrap();

        // Unrelated change: nothing happens.
        h.store
            .apply_remote_config(
                &[FaceUpdate {
                    face: face(6),
                    habit_id: Some("other".into()),
                    mode: Some(HabitMode::Counter),
                }],
                2,
            )
            .await
            .unwrap();
        assert_eq!(h.controller.on_config_changed().await.unwrap(), None);

        h.store
            .apply_remote_config(
                &[FaceUpdate {
                    face: face(2),
                    habit_id: Some("run".into()),
                    mode: Some(HabitMode::Counter),
                }],
                3,
            )
            .await
            .unwrap();
        h.clock.set_epoch_seconds(70);
        let flushed = h.controller.on_config_changed().await.unwrap();

        assert_eq!(flushed, Some(HabitEvent::duration("walk", 10, 70)));
        let snapshot = h.controller.snapshot().await;
        assert_eq!(snapshot.status, SessionStatus::Counting);
        assert_eq!(snapshot.habit_id.as_deref(), Some("run"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_session_flushes_pending_count() {
        let h = harness(&[(0, "h1", HabitMode::Counter)]).await;
        h.controller.on_face(face(0)).await.unwrap();
        h.controller.record_impact().await;

        h.clock.set_epoch_seconds(9);
        let flushed = h.controller.end_session().await.unwrap();
        assert_eq!(flushed, Some(HabitEvent::count("h1", 1, 9)));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(h.events().len(), 1);
        assert_eq!(h.controller.snapshot().await.active_face, None);
    }
}
