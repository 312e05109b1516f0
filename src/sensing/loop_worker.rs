use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::SensorError;
use crate::habits::HabitController;
use crate::ports::{SensorPort, Transport};

use super::classifier::OrientationClassifier;
use super::sampler::VectorSampler;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Poll the sensor every `check_interval` and feed the settled face to the
/// session controller until cancelled.
pub async fn orientation_loop<S, T>(
    mut sensor: S,
    sampler: VectorSampler,
    classifier: OrientationClassifier,
    controller: HabitController<T>,
    check_interval: Duration,
    cancel_token: CancellationToken,
) where
    S: SensorPort + Send + 'static,
    T: Transport,
{
    let mut ticker = tokio::time::interval(check_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                check_orientation(&mut sensor, &sampler, &classifier, &controller).await;
            }
            _ = cancel_token.cancelled() => {
                log_info!("orientation loop shutting down");
                break;
            }
        }
    }
}

async fn check_orientation<S, T>(
    sensor: &mut S,
    sampler: &VectorSampler,
    classifier: &OrientationClassifier,
    controller: &HabitController<T>,
) where
    S: SensorPort,
    T: Transport,
{
    let samples = match sampler.collect(sensor).await {
        Ok(samples) => samples,
        Err(SensorError::NotReady) => {
            log_debug!("sensor not ready, skipping orientation check");
            return;
        }
        Err(err) => {
            log_warn!("orientation check skipped: {err}");
            return;
        }
    };

    let Some(face) = classifier.classify(&samples) else {
        log_debug!("orientation indeterminate");
        return;
    };

    if let Err(err) = controller.on_face(face).await {
        log_error!("failed to report session for face change to {face}: {err}");
    }
}
