pub mod controller;
pub mod event;
pub mod state;

pub use controller::{HabitController, SessionConfig, SessionSnapshot};
pub use event::{HabitEvent, Measurement};
pub use state::{Activity, SessionState, SessionStatus};
