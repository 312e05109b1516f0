use anyhow::{bail, Context, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::habits::HabitController;
use crate::ports::{SensorPort, Transport};

use super::classifier::{ClassifierConfig, OrientationClassifier};
use super::loop_worker::orientation_loop;
use super::sampler::{SamplingConfig, VectorSampler};

pub struct SensingController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl SensingController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start_sensing<S, T>(
        &mut self,
        sensor: S,
        sampling: &SamplingConfig,
        classifier: &ClassifierConfig,
        controller: HabitController<T>,
    ) -> Result<()>
    where
        S: SensorPort + Send + 'static,
        T: Transport,
    {
        if self.is_running() {
            bail!("sensing already active");
        }

        info!(
            "Starting orientation loop (check every {}ms, {} samples per burst)",
            sampling.check_interval_ms, sampling.sample_count
        );

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(orientation_loop(
            sensor,
            VectorSampler::new(sampling),
            OrientationClassifier::new(*classifier),
            controller,
            Duration::from_millis(sampling.check_interval_ms.max(1)),
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop_sensing(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("orientation loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for SensingController {
    fn default() -> Self {
        Self::new()
    }
}
