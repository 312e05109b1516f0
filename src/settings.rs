use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use crate::habits::SessionConfig;
use crate::sensing::{ClassifierConfig, SamplingConfig};
use crate::telemetry::TelemetryConfig;

pub const SETTINGS_PATH_ENV: &str = "FACETRACK_SETTINGS";
pub const DEFAULT_SETTINGS_PATH: &str = "facetrack.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageSettings {
    pub database_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("facetrack.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DeviceSettings {
    pub storage: StorageSettings,
    pub sampling: SamplingConfig,
    pub classifier: ClassifierConfig,
    pub session: SessionConfig,
    pub telemetry: TelemetryConfig,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<DeviceSettings>,
}

impl SettingsStore {
    /// Settings file named by `FACETRACK_SETTINGS`, or `facetrack.json`.
    pub fn default_path() -> PathBuf {
        std::env::var_os(SETTINGS_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH))
    }

    /// Load settings, writing the defaults on first run. Missing fields take
    /// their default; an unreadable document falls back to defaults entirely.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring malformed settings in {}: {err}", path.display());
                DeviceSettings::default()
            })
        } else {
            let defaults = DeviceSettings::default();
            persist(&path, &defaults)?;
            info!("Wrote default settings to {}", path.display());
            defaults
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current(&self) -> DeviceSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn persist(path: &Path, data: &DeviceSettings) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create settings directory {}", parent.display()))?;
    }
    let serialized = serde_json::to_string_pretty(data)?;
    fs::write(path, serialized)
        .with_context(|| format!("Failed to write settings to {}", path.display()))
}
