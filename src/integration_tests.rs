//! End-to-end scenarios: simulated sensor → orientation loop → session
//! controller → transport, with configuration arriving through the device.

use std::sync::Arc;

use rand::{rngs::StdRng, SeedableRng};
use serde_json::json;
use tempfile::TempDir;
use tokio::time::{sleep, Duration};

use crate::adapters::{FaceHandle, SimulatedAccelerometer};
use crate::config::{FaceConfigStore, FaceIndex, HabitMode};
use crate::db::Database;
use crate::device::Device;
use crate::habits::{HabitEvent, Measurement, SessionStatus};
use crate::ports::KeyValueStore;
use crate::sensing::{OrientationClassifier, SensingController, Vector3};
use crate::settings::DeviceSettings;
use crate::test_support::{ManualClock, MemoryStore, RecordingTransport};

const CONFIG_TOPIC: &str = "facetrack/config";
const EVENT_TOPIC: &str = "facetrack/events";

struct Rig<S> {
    device: Device<S, RecordingTransport>,
    transport: RecordingTransport,
    clock: ManualClock,
    face: FaceHandle,
    sensing: SensingController,
}

impl<S: KeyValueStore + 'static> Rig<S> {
    async fn new(storage: S, epoch_seconds: i64) -> Self {
        let transport = RecordingTransport::new();
        let clock = ManualClock::at_epoch_seconds(epoch_seconds);
        let device = Device::new(
            storage,
            transport.clone(),
            Arc::new(clock.clone()),
            &DeviceSettings::default(),
        )
        .await
        .unwrap();

        Self {
            device,
            transport,
            clock,
            face: FaceHandle::new(None),
            sensing: SensingController::new(),
        }
    }

    async fn configure(&self, document: serde_json::Value) {
        self.device
            .on_message(CONFIG_TOPIC, document.to_string().as_bytes())
            .await
            .unwrap();
    }

    fn start_sensing(&mut self) {
        let settings = DeviceSettings::default();
        let sensor =
            SimulatedAccelerometer::with_rng(self.face.clone(), StdRng::seed_from_u64(42));
        self.sensing
            .start_sensing(
                sensor,
                &settings.sampling,
                &settings.classifier,
                self.device.controller(),
            )
            .unwrap();
    }

    fn rest_on(&self, face: usize) {
        self.face.set(FaceIndex::new(face));
    }

    fn events(&self) -> Vec<HabitEvent> {
        self.transport
            .sent_to(EVENT_TOPIC)
            .iter()
            .map(|bytes| HabitEvent::decode(bytes).unwrap())
            .collect()
    }
}

#[tokio::test(start_paused = true)]
async fn test_taps_then_unconfigured_face_report_one_count() {
    let mut rig = Rig::new(MemoryStore::new(), 1_000).await;
    rig.configure(json!({ "version": 1, "state": { "0": { "id": "h1", "type": "COUNT" } } }))
        .await;

    rig.rest_on(0);
    rig.start_sensing();
    sleep(Duration::from_secs(2)).await;
    assert_eq!(
        rig.device.controller().snapshot().await.status,
        SessionStatus::Counting
    );

    for _ in 0..3 {
        assert!(rig.device.controller().record_impact().await);
        sleep(Duration::from_secs(1)).await;
    }

    rig.rest_on(5);
    sleep(Duration::from_secs(2)).await;
    rig.sensing.stop_sensing().await.unwrap();

    let events = rig.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].habit_id, "h1");
    assert_eq!(events[0].measurement, Measurement::Count(3));

    // Nothing more once the device sits on the unconfigured face.
    sleep(Duration::from_secs(10)).await;
    assert_eq!(rig.events().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timer_face_reports_duration() {
    let mut rig = Rig::new(MemoryStore::new(), 100).await;
    rig.configure(json!({ "version": 1, "state": { "1": { "id": "h2", "type": "TIME" } } }))
        .await;

    rig.rest_on(1);
    rig.start_sensing();
    sleep(Duration::from_secs(1)).await;

    rig.clock.set_epoch_seconds(130);
    rig.rest_on(2);
    sleep(Duration::from_secs(2)).await;
    rig.sensing.stop_sensing().await.unwrap();

    assert_eq!(rig.events(), vec![HabitEvent::duration("h2", 100, 130)]);
}

#[tokio::test]
async fn test_update_without_type_inherits_timer_mode() {
    let storage = MemoryStore::new();
    let rig = Rig::new(storage.clone(), 0).await;
    rig.configure(json!({ "version": 1, "state": { "3": { "id": "read", "type": "TIME" } } }))
        .await;
    rig.configure(json!({ "version": 2, "state": { "3": { "id": "study" } } }))
        .await;

    let face = FaceIndex::new(3).unwrap();
    let config = rig.device.store().faces().get(face).clone();
    assert_eq!(config.habit_id, "study");
    assert_eq!(config.mode, HabitMode::Timer);

    // Durable as well.
    let reloaded = FaceConfigStore::load(storage).await.unwrap();
    assert_eq!(reloaded.faces().get(face), &config);
    assert_eq!(reloaded.version(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_indeterminate_orientation_changes_nothing() {
    let classifier = OrientationClassifier::default();
    let tumbling = vec![Vector3::new(3.0, -2.0, 4.0); 10];
    assert_eq!(classifier.classify(&tumbling), None);

    let mut rig = Rig::new(MemoryStore::new(), 0).await;
    rig.configure(json!({ "version": 1, "state": { "1": { "id": "h2", "type": "TIME" } } }))
        .await;
    rig.rest_on(1);
    rig.start_sensing();
    sleep(Duration::from_secs(1)).await;

    // Picked up: readings near zero never classify.
    rig.face.set(None);
    sleep(Duration::from_secs(6)).await;
    rig.sensing.stop_sensing().await.unwrap();

    let snapshot = rig.device.controller().snapshot().await;
    assert_eq!(snapshot.active_face, FaceIndex::new(1));
    assert_eq!(snapshot.status, SessionStatus::Timing);
    assert!(rig.events().is_empty());
}

#[tokio::test]
async fn test_configuration_survives_restart_on_sqlite() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("facetrack.db");

    {
        let rig = Rig::new(Database::new(path.clone()).unwrap(), 0).await;
        rig.configure(json!({
            "version": 3,
            "state": {
                "0": { "id": "pushups", "type": "COUNT" },
                "7": { "id": "reading", "type": "TIME" }
            }
        }))
        .await;
    }

    let rig = Rig::new(Database::new(path).unwrap(), 0).await;
    rig.device.report_snapshot().await.unwrap();

    let sent = rig.transport.sent_to("facetrack/shadow/update");
    let document: serde_json::Value = serde_json::from_slice(&sent[0]).unwrap();
    assert_eq!(
        document,
        json!({
            "state": {
                "reported": {
                    "0": { "id": "pushups", "type": "COUNT" },
                    "7": { "id": "reading", "type": "TIME" }
                }
            }
        })
    );
    assert_eq!(rig.device.store().version(), 3);
}
