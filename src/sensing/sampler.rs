use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::Vector3;
use crate::error::SensorError;
use crate::ports::SensorPort;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SamplingConfig {
    /// Samples per burst fed to the median filter.
    pub sample_count: usize,
    /// Delay between consecutive samples of a burst.
    pub sample_interval_ms: u64,
    /// Delay between orientation checks.
    pub check_interval_ms: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            sample_count: 10,
            sample_interval_ms: 10,
            check_interval_ms: 1500,
        }
    }
}

/// Draws fixed-size bursts of raw samples from a sensor.
#[derive(Debug, Clone)]
pub struct VectorSampler {
    sample_count: usize,
    sample_interval: Duration,
}

impl VectorSampler {
    pub fn new(config: &SamplingConfig) -> Self {
        Self {
            sample_count: config.sample_count.max(1),
            sample_interval: Duration::from_millis(config.sample_interval_ms),
        }
    }

    /// Collect one burst. A sensor that is not ready yields `NotReady`
    /// without any read; a failed read aborts the burst.
    pub async fn collect<S: SensorPort>(&self, sensor: &mut S) -> Result<Vec<Vector3>, SensorError> {
        if !sensor.is_ready() {
            return Err(SensorError::NotReady);
        }

        let mut samples = Vec::with_capacity(self.sample_count);
        for i in 0..self.sample_count {
            samples.push(sensor.read()?);
            if i + 1 < self.sample_count && !self.sample_interval.is_zero() {
                tokio::time::sleep(self.sample_interval).await;
            }
        }
        Ok(samples)
    }
}
