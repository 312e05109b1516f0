//! Ports: the traits through which the core reaches its collaborators.
//!
//! - **SensorPort**: raw accelerometer samples (driver, simulation, test fake)
//! - **KeyValueStore**: durable per-field persistence (SQLite, in-memory)
//! - **Clock**: wall-clock time for timestamps
//! - **Transport**: upstream publish to the remote collector
//!
//! Inbound configuration messages are routed by `Device::on_message`.

pub mod clock;
pub mod sensor;
pub mod storage;
pub mod transport;

pub use clock::{Clock, SystemClock};
pub use sensor::SensorPort;
pub use storage::KeyValueStore;
pub use transport::Transport;
