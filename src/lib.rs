pub mod adapters;
pub mod config;
pub mod console;
pub mod db;
pub mod device;
pub mod error;
pub mod habits;
pub mod ports;
pub mod sensing;
pub mod settings;
pub mod telemetry;
mod utils;

#[cfg(test)]
mod integration_tests;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use adapters::{FaceHandle, LoggingTransport, SimulatedAccelerometer};
use db::Database;
use device::Device;
use ports::SystemClock;
use sensing::SensingController;
use settings::SettingsStore;

pub const DEBUG_ENV: &str = "FACETRACK_DEBUG";

fn debug_mode() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(if debug_mode() {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    info!("facetrack starting up...");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Failed to start async runtime: {err}");
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(run_device());
    // A pending stdin read would otherwise block runtime teardown.
    runtime.shutdown_background();

    if let Err(err) = result {
        error!("facetrack stopped: {err:#}");
        std::process::exit(1);
    }
}

async fn run_device() -> Result<()> {
    let settings_store = SettingsStore::new(SettingsStore::default_path())?;
    info!("Using settings from {}", settings_store.path().display());
    let settings = settings_store.current();

    let database = Database::new(settings.storage.database_path.clone())?;
    let transport = LoggingTransport::new(settings.telemetry.event_topic.clone());
    let device = Device::new(database, transport, Arc::new(SystemClock), &settings).await?;

    if let Err(err) = device.report_snapshot().await {
        warn!("Startup snapshot not published: {err:#}");
    }

    let face = FaceHandle::new(None);
    let mut sensing = SensingController::new();
    sensing.start_sensing(
        SimulatedAccelerometer::new(face.clone()),
        &settings.sampling,
        &settings.classifier,
        device.controller(),
    )?;

    let cancel_token = CancellationToken::new();
    let heartbeat = device.spawn_snapshot_heartbeat(cancel_token.clone());

    tokio::select! {
        result = console::run_console(&device, &face) => {
            result.context("console failed")?;
            info!("Console closed, shutting down");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            info!("Ctrl-C received, shutting down");
        }
    }

    cancel_token.cancel();
    if let Some(handle) = heartbeat {
        if let Err(err) = handle.await {
            warn!("Snapshot heartbeat did not stop cleanly: {err}");
        }
    }
    sensing.stop_sensing().await?;
    device.shutdown().await;

    Ok(())
}
