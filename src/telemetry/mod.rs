pub mod reporter;

pub use reporter::{snapshot_document, EventReporter, TelemetryConfig};
