pub mod model;
pub mod remote;
pub mod store;

pub use model::{ConfigVersion, FaceConfig, FaceIndex, FaceTable, HabitMode, FACE_COUNT};
pub use remote::{FaceUpdate, RemoteConfig};
pub use store::{ApplyOutcome, ConfigSnapshot, FaceConfigStore, FaceLookup, SnapshotEntry};
