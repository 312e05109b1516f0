use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::{ApplyOutcome, FaceConfigStore, RemoteConfig};
use crate::habits::HabitController;
use crate::ports::{Clock, KeyValueStore, Transport};
use crate::settings::DeviceSettings;
use crate::telemetry::EventReporter;

/// Owns the configuration store, reporter and session controller and routes
/// inbound messages between them.
pub struct Device<S, T> {
    store: Arc<FaceConfigStore<S>>,
    reporter: Arc<EventReporter<T>>,
    controller: HabitController<T>,
    config_topic: String,
    snapshot_interval: Option<Duration>,
}

impl<S, T> Device<S, T>
where
    S: KeyValueStore + 'static,
    T: Transport,
{
    pub async fn new(
        storage: S,
        transport: T,
        clock: Arc<dyn Clock>,
        settings: &DeviceSettings,
    ) -> Result<Self> {
        let store = Arc::new(
            FaceConfigStore::load(storage)
                .await
                .context("failed to load face configuration")?,
        );
        let reporter = Arc::new(EventReporter::new(transport, &settings.telemetry));
        let controller =
            HabitController::new(store.clone(), reporter.clone(), clock, &settings.session);

        let interval_secs = settings.telemetry.snapshot_interval_secs;
        Ok(Self {
            store,
            reporter,
            controller,
            config_topic: settings.telemetry.config_topic.clone(),
            snapshot_interval: (interval_secs > 0).then(|| Duration::from_secs(interval_secs)),
        })
    }

    pub fn controller(&self) -> HabitController<T> {
        self.controller.clone()
    }

    pub fn store(&self) -> &FaceConfigStore<S> {
        &self.store
    }

    pub fn config_topic(&self) -> &str {
        &self.config_topic
    }

    /// Publish the current configuration snapshot.
    pub async fn report_snapshot(&self) -> Result<()> {
        self.reporter
            .emit_snapshot(self.store.version(), &self.store.snapshot())
            .await
            .context("failed to publish configuration snapshot")
    }

    /// Handle an inbound message. Only the configuration topic is consumed.
    ///
    /// An applied update re-activates the current face if its habit changed,
    /// then the resulting configuration is acknowledged with a snapshot. A
    /// stale update changes nothing but is still answered with the current
    /// snapshot. When a write fails partway the session still follows the
    /// faces that were stored, and the error is returned without a snapshot.
    pub async fn on_message(&self, topic: &str, payload: &[u8]) -> Result<()> {
        if topic != self.config_topic {
            debug!("Ignoring message on unrelated topic {topic}");
            return Ok(());
        }

        let update = RemoteConfig::parse(payload).context("rejected configuration document")?;
        let outcome = match self
            .store
            .apply_remote_config(&update.entries, update.version)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                // Faces written before the failure are already live.
                self.resync_session().await;
                return Err(err).context("failed to persist configuration");
            }
        };

        match outcome {
            ApplyOutcome::Applied { changed, .. } if !changed.is_empty() => {
                self.resync_session().await;
            }
            ApplyOutcome::Applied { .. } => {}
            ApplyOutcome::Stale { current } => {
                debug!("Answering stale update with version {current}");
            }
        }

        self.report_snapshot().await
    }

    async fn resync_session(&self) {
        if let Err(err) = self.controller.on_config_changed().await {
            error!("Failed to report session closed by reconfiguration: {err}");
        }
    }

    /// Republish the snapshot every `snapshot_interval` until cancelled. The
    /// first publish happens one interval after the call.
    pub fn spawn_snapshot_heartbeat(&self, cancel_token: CancellationToken) -> Option<JoinHandle<()>> {
        let every = self.snapshot_interval?;
        let store = self.store.clone();
        let reporter = self.reporter.clone();

        Some(tokio::spawn(async move {
            let mut interval = time::interval_at(time::Instant::now() + every, every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(err) = reporter.emit_snapshot(store.version(), &store.snapshot()).await {
                            warn!("Periodic snapshot failed: {err}");
                        }
                    }
                    _ = cancel_token.cancelled() => break,
                }
            }
        }))
    }

    /// Flush the running session before the process exits.
    pub async fn shutdown(&self) {
        match self.controller.end_session().await {
            Ok(Some(event)) => info!("Flushed session for '{}' on shutdown", event.habit_id),
            Ok(None) => {}
            Err(err) => error!("Failed to report session on shutdown: {err}"),
        }
    }
}
