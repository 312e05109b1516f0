//! In-memory fakes for the ports, shared by unit and integration tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};

use crate::error::{SensorError, StorageError, TransportError};
use crate::ports::{Clock, KeyValueStore, SensorPort, Transport};
use crate::sensing::Vector3;

pub struct ScriptedSensor {
    reading: Vector3,
    ready: bool,
    reads: usize,
    fail_after: Option<usize>,
}

impl ScriptedSensor {
    pub fn steady(reading: Vector3) -> Self {
        Self {
            reading,
            ready: true,
            reads: 0,
            fail_after: None,
        }
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn fail_after(&mut self, successful_reads: usize) {
        self.fail_after = Some(successful_reads);
    }

    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl SensorPort for ScriptedSensor {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn read(&mut self) -> Result<Vector3, SensorError> {
        self.reads += 1;
        match self.fail_after {
            Some(limit) if self.reads > limit => Err(SensorError::ReadFailed("bus error".into())),
            _ => Ok(self.reading),
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    failing_keys: Arc<Mutex<HashSet<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes_to(&self, key: &str) {
        self.failing_keys.lock().unwrap().insert(key.to_string());
    }

    pub fn heal(&self) {
        self.failing_keys.lock().unwrap().clear();
    }

    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.values.lock().unwrap().get(key).cloned()
    }

    pub fn insert_raw(&self, key: &str, value: &[u8]) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.raw(key))
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        if self.failing_keys.lock().unwrap().contains(key) {
            return Err(StorageError::WriteFailed {
                key: key.to_string(),
                reason: "injected failure".into(),
            });
        }
        self.insert_raw(key, value);
        Ok(())
    }
}

#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn at_epoch_seconds(seconds: i64) -> Self {
        Self {
            now: Arc::new(Mutex::new(Utc.timestamp_opt(seconds, 0).unwrap())),
        }
    }

    pub fn set_epoch_seconds(&self, seconds: i64) {
        *self.now.lock().unwrap() = Utc.timestamp_opt(seconds, 0).unwrap();
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[derive(Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    offline: Arc<AtomicBool>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(String, Vec<u8>)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, topic: &str) -> Vec<Vec<u8>> {
        self.sent()
            .into_iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, payload)| payload)
            .collect()
    }
}

impl Transport for RecordingTransport {
    async fn send(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        self.sent.lock().unwrap().push((topic.to_string(), payload));
        Ok(())
    }
}
