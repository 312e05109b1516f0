//! Stand-in implementations of the ports for running without hardware.

pub mod logging_transport;
pub mod simulated_sensor;

pub use logging_transport::LoggingTransport;
pub use simulated_sensor::{FaceHandle, SimulatedAccelerometer};
