use std::future::Future;

use crate::error::TransportError;

/// Port for publishing to the remote collector.
///
/// Sends are fire-and-forget from the core's point of view: a failure is
/// reported to the caller and never retried here.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, topic: &str, payload: Vec<u8>) -> impl Future<Output = Result<(), TransportError>> + Send;
}
