//! Error types shared across component seams.
//!
//! Components return these typed errors; the application layer wraps them in
//! `anyhow` with context, the same way the database and settings code do.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SensorError {
    #[error("sensor not ready")]
    NotReady,
    #[error("sensor read failed: {0}")]
    ReadFailed(String),
}

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("failed to read key '{key}': {reason}")]
    ReadFailed { key: String, reason: String },
    #[error("failed to write key '{key}': {reason}")]
    WriteFailed { key: String, reason: String },
}

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("transport not connected")]
    NotConnected,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to encode habit event: {0}")]
    Encode(#[from] postcard::Error),
    #[error("failed to encode configuration snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed configuration document: {0}")]
    Malformed(String),
}
