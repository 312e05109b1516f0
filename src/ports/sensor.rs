use crate::error::SensorError;
use crate::sensing::Vector3;

/// Port for reading raw accelerometer data.
///
/// Register access and bus handling belong to the implementation; the core
/// only asks whether a sample is available and reads it.
pub trait SensorPort {
    /// Whether the device has a sample ready. When this is `false` the
    /// sampler skips the cycle without calling `read`.
    fn is_ready(&self) -> bool;

    /// Read a single 3-axis sample in m/s².
    fn read(&mut self) -> Result<Vector3, SensorError>;
}
