use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of faces on the device.
pub const FACE_COUNT: usize = 12;

/// Generation of the last applied remote configuration. 0 = never configured.
pub type ConfigVersion = u32;

/// Index of a physical face, always in `0..FACE_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct FaceIndex(usize);

impl FaceIndex {
    pub fn new(index: usize) -> Option<Self> {
        (index < FACE_COUNT).then_some(Self(index))
    }

    pub fn get(self) -> usize {
        self.0
    }

    pub fn all() -> impl Iterator<Item = FaceIndex> {
        (0..FACE_COUNT).map(FaceIndex)
    }
}

impl fmt::Display for FaceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a face tracks its habit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum HabitMode {
    #[default]
    #[serde(rename = "UNSET")]
    Unset,
    #[serde(rename = "COUNT")]
    Counter,
    #[serde(rename = "TIME")]
    Timer,
}

impl HabitMode {
    /// Persisted representation; matches the wire enum of the config service.
    pub fn code(self) -> i32 {
        match self {
            HabitMode::Unset => 0,
            HabitMode::Counter => 1,
            HabitMode::Timer => 2,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(HabitMode::Unset),
            1 => Some(HabitMode::Counter),
            2 => Some(HabitMode::Timer),
            _ => None,
        }
    }

    /// Parse the `type` field of remote documents.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "COUNT" => Some(HabitMode::Counter),
            "TIME" => Some(HabitMode::Timer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FaceConfig {
    pub habit_id: String,
    pub mode: HabitMode,
}

impl FaceConfig {
    pub fn new(habit_id: impl Into<String>, mode: HabitMode) -> Self {
        Self {
            habit_id: habit_id.into(),
            mode,
        }
    }

    /// A face tracks a habit only when it has both an id and a mode.
    pub fn is_configured(&self) -> bool {
        !self.habit_id.is_empty() && self.mode != HabitMode::Unset
    }
}

/// Per-face configuration, indexed by face number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceTable {
    faces: [FaceConfig; FACE_COUNT],
}

impl Default for FaceTable {
    fn default() -> Self {
        Self {
            faces: std::array::from_fn(|_| FaceConfig::default()),
        }
    }
}

impl FaceTable {
    pub fn get(&self, face: FaceIndex) -> &FaceConfig {
        &self.faces[face.get()]
    }

    pub(crate) fn get_mut(&mut self, face: FaceIndex) -> &mut FaceConfig {
        &mut self.faces[face.get()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (FaceIndex, &FaceConfig)> {
        FaceIndex::all().zip(self.faces.iter())
    }

    pub fn configured_count(&self) -> usize {
        self.faces.iter().filter(|f| f.is_configured()).count()
    }
}
