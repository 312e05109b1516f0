use log::info;

use crate::error::TransportError;
use crate::habits::HabitEvent;
use crate::ports::Transport;

/// Transport that writes every publish to the log instead of a broker.
#[derive(Debug, Clone, Default)]
pub struct LoggingTransport {
    event_topic: String,
}

impl LoggingTransport {
    /// Payloads on `event_topic` are decoded as habit records for display.
    pub fn new(event_topic: impl Into<String>) -> Self {
        Self {
            event_topic: event_topic.into(),
        }
    }
}

impl Transport for LoggingTransport {
    async fn send(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        if topic == self.event_topic {
            match HabitEvent::decode(&payload) {
                Ok(event) => info!("[{topic}] {event:?} ({})", to_hex(&payload)),
                Err(_) => info!("[{topic}] {}", to_hex(&payload)),
            }
        } else {
            info!("[{topic}] {}", String::from_utf8_lossy(&payload));
        }
        Ok(())
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
