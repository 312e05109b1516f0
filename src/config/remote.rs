//! Parser for configuration documents pushed by the remote side.
//!
//! ```text
//! { "version": 7, "state": { "0": { "id": "pushups", "type": "COUNT" },
//!                            "4": { "id": "reading" } } }
//! ```
//!
//! Document-level problems (not JSON, no usable version, `state` not an
//! object) reject the whole update. Problems with a single face entry only
//! drop that entry.

use log::warn;
use serde_json::{Map, Value};

use super::model::{ConfigVersion, FaceIndex, HabitMode};
use crate::error::ConfigError;

/// One face's requested configuration. Fields the sender left out are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceUpdate {
    pub face: FaceIndex,
    pub habit_id: Option<String>,
    pub mode: Option<HabitMode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub version: ConfigVersion,
    pub entries: Vec<FaceUpdate>,
}

impl RemoteConfig {
    pub fn parse(payload: &[u8]) -> Result<Self, ConfigError> {
        let document: Value = serde_json::from_slice(payload)?;
        let root = document
            .as_object()
            .ok_or_else(|| ConfigError::Malformed("document is not an object".into()))?;

        let version = root
            .get("version")
            .and_then(Value::as_u64)
            .and_then(|v| ConfigVersion::try_from(v).ok())
            .ok_or_else(|| ConfigError::Malformed("missing or invalid version".into()))?;

        let entries = match root.get("state") {
            Some(Value::Object(state)) => parse_entries(state),
            Some(Value::Null) | None => Vec::new(),
            Some(_) => return Err(ConfigError::Malformed("state is not an object".into())),
        };

        Ok(Self { version, entries })
    }
}

fn parse_entries(state: &Map<String, Value>) -> Vec<FaceUpdate> {
    let mut entries: Vec<FaceUpdate> = state
        .iter()
        .filter_map(|(key, value)| match parse_entry(key, value) {
            Ok(entry) => Some(entry),
            Err(reason) => {
                warn!("Dropping configuration entry '{key}': {reason}");
                None
            }
        })
        .collect();
    entries.sort_by_key(|entry| entry.face);
    entries
}

fn parse_entry(key: &str, value: &Value) -> Result<FaceUpdate, String> {
    let face = key
        .parse::<usize>()
        .ok()
        .and_then(FaceIndex::new)
        .ok_or_else(|| "not a face index".to_string())?;

    let fields = value
        .as_object()
        .ok_or_else(|| "entry is not an object".to_string())?;

    let habit_id = match fields.get("id") {
        Some(Value::String(id)) => Some(id.clone()),
        Some(Value::Null) | None => None,
        Some(other) => return Err(format!("id must be a string, got {other}")),
    };

    let mode = match fields.get("type") {
        Some(Value::String(raw)) => Some(
            HabitMode::from_wire(raw).ok_or_else(|| format!("unknown type '{raw}'"))?,
        ),
        Some(Value::Null) | None => None,
        Some(other) => return Err(format!("type must be a string, got {other}")),
    };

    Ok(FaceUpdate {
        face,
        habit_id,
        mode,
    })
}
