use std::collections::BTreeMap;
use std::sync::RwLock;

use log::{info, warn};
use serde::Serialize;
use tokio::sync::Mutex;

use super::model::{ConfigVersion, FaceConfig, FaceIndex, FaceTable, HabitMode};
use super::remote::FaceUpdate;
use crate::error::StorageError;
use crate::ports::KeyValueStore;

const VERSION_KEY: &str = "config/version";

fn habit_id_key(face: FaceIndex) -> String {
    format!("face/{face}/id")
}

fn mode_key(face: FaceIndex) -> String {
    format!("face/{face}/type")
}

/// Read-only access to face configuration, used by the session controller.
pub trait FaceLookup: Send + Sync {
    fn face(&self, face: FaceIndex) -> FaceConfig;
}

/// Configured faces only, keyed by face number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct ConfigSnapshot(BTreeMap<FaceIndex, SnapshotEntry>);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub mode: HabitMode,
}

impl ConfigSnapshot {
    pub fn from_table(table: &FaceTable) -> Self {
        Self(
            table
                .iter()
                .filter(|(_, config)| config.is_configured())
                .map(|(face, config)| {
                    (
                        face,
                        SnapshotEntry {
                            id: config.habit_id.clone(),
                            mode: config.mode,
                        },
                    )
                })
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, face: FaceIndex) -> Option<&SnapshotEntry> {
        self.0.get(&face)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied {
        version: ConfigVersion,
        changed: Vec<FaceIndex>,
        discarded: Vec<FaceIndex>,
    },
    /// The update is older than what is already stored.
    Stale { current: ConfigVersion },
}

struct StoreState {
    faces: FaceTable,
    version: ConfigVersion,
}

/// Owns the per-face configuration and keeps it durable.
///
/// The in-memory table only changes after the matching storage write has
/// succeeded, so memory never runs ahead of what survives a restart.
pub struct FaceConfigStore<S> {
    storage: S,
    state: RwLock<StoreState>,
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> FaceConfigStore<S> {
    pub async fn load(storage: S) -> Result<Self, StorageError> {
        let version = match storage.get(VERSION_KEY).await? {
            Some(bytes) => decode_version(&bytes).unwrap_or_else(|| {
                warn!("Ignoring unreadable config version record ({} bytes)", bytes.len());
                0
            }),
            None => 0,
        };

        let mut faces = FaceTable::default();
        for face in FaceIndex::all() {
            let config = faces.get_mut(face);

            if let Some(bytes) = storage.get(&habit_id_key(face)).await? {
                match String::from_utf8(bytes) {
                    Ok(habit_id) => config.habit_id = habit_id,
                    Err(_) => warn!("Face {face}: stored habit id is not UTF-8, treating as unset"),
                }
            }

            if let Some(bytes) = storage.get(&mode_key(face)).await? {
                match decode_mode(&bytes) {
                    Some(mode) => config.mode = mode,
                    None => warn!("Face {face}: stored mode is invalid, treating as unset"),
                }
            }
        }

        if version == 0 && faces.configured_count() == 0 {
            info!("No stored face configuration, starting unconfigured");
        } else {
            info!(
                "Loaded face configuration version {} ({} configured faces)",
                version,
                faces.configured_count()
            );
        }

        Ok(Self {
            storage,
            state: RwLock::new(StoreState { faces, version }),
            write_lock: Mutex::new(()),
        })
    }

    pub fn version(&self) -> ConfigVersion {
        self.read_state().version
    }

    pub fn faces(&self) -> FaceTable {
        self.read_state().faces.clone()
    }

    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot::from_table(&self.read_state().faces)
    }

    pub async fn save_habit_id(&self, face: FaceIndex, habit_id: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        self.write_habit_id(face, habit_id).await
    }

    pub async fn save_mode(&self, face: FaceIndex, mode: HabitMode) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        self.write_mode(face, mode).await
    }

    /// Replace the faces named in `entries`, then record `new_version`.
    ///
    /// Entries without a habit id are discarded. A missing mode keeps the
    /// face's previous mode; when there is none to keep the entry is
    /// discarded. An empty habit id unassigns the face.
    ///
    /// Each field is written on its own, habit id before mode, and the version
    /// only after every face. A failed write stops the update and returns the
    /// error; fields already written stay applied, so a face can be left with
    /// its new habit id and old mode. The version is not advanced, so the same
    /// update can be retried and completes the face.
    pub async fn apply_remote_config(
        &self,
        entries: &[FaceUpdate],
        new_version: ConfigVersion,
    ) -> Result<ApplyOutcome, StorageError> {
        let _guard = self.write_lock.lock().await;

        let current = self.version();
        if new_version < current {
            warn!("Ignoring configuration version {new_version}, already at {current}");
            return Ok(ApplyOutcome::Stale { current });
        }

        let mut changed = Vec::new();
        let mut discarded = Vec::new();

        for entry in entries {
            let previous = self.face(entry.face);
            let Some(target) = resolve_update(entry, &previous) else {
                warn!("Discarding incomplete configuration for face {}", entry.face);
                discarded.push(entry.face);
                continue;
            };

            if target == previous {
                continue;
            }
            if target.habit_id != previous.habit_id {
                self.write_habit_id(entry.face, &target.habit_id).await?;
            }
            if target.mode != previous.mode {
                self.write_mode(entry.face, target.mode).await?;
            }
            changed.push(entry.face);
        }

        if new_version != current {
            self.storage
                .put(VERSION_KEY, &new_version.to_le_bytes())
                .await?;
            self.write_state().version = new_version;
        }

        info!(
            "Applied configuration version {} ({} faces changed, {} discarded)",
            new_version,
            changed.len(),
            discarded.len()
        );

        Ok(ApplyOutcome::Applied {
            version: new_version,
            changed,
            discarded,
        })
    }

    async fn write_habit_id(&self, face: FaceIndex, habit_id: &str) -> Result<(), StorageError> {
        self.storage
            .put(&habit_id_key(face), habit_id.as_bytes())
            .await?;
        self.write_state().faces.get_mut(face).habit_id = habit_id.to_string();
        Ok(())
    }

    async fn write_mode(&self, face: FaceIndex, mode: HabitMode) -> Result<(), StorageError> {
        self.storage
            .put(&mode_key(face), &mode.code().to_le_bytes())
            .await?;
        self.write_state().faces.get_mut(face).mode = mode;
        Ok(())
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<S: KeyValueStore> FaceLookup for FaceConfigStore<S> {
    fn face(&self, face: FaceIndex) -> FaceConfig {
        self.read_state().faces.get(face).clone()
    }
}

fn resolve_update(entry: &FaceUpdate, previous: &FaceConfig) -> Option<FaceConfig> {
    let habit_id = entry.habit_id.as_ref()?;
    if habit_id.is_empty() {
        return Some(FaceConfig::default());
    }

    let mode = match entry.mode {
        Some(mode) if mode != HabitMode::Unset => mode,
        _ if previous.mode != HabitMode::Unset => previous.mode,
        _ => return None,
    };

    Some(FaceConfig::new(habit_id.clone(), mode))
}

fn decode_version(bytes: &[u8]) -> Option<ConfigVersion> {
    Some(ConfigVersion::from_le_bytes(bytes.try_into().ok()?))
}

fn decode_mode(bytes: &[u8]) -> Option<HabitMode> {
    HabitMode::from_code(i32::from_le_bytes(bytes.try_into().ok()?))
}
