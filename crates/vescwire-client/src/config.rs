use std::time::Duration;

use serde::{Deserialize, Serialize};
use vescwire_frame::{ReceiverConfig, DEFAULT_BUFFER_CAPACITY, MAX_SHORT_PAYLOAD};

/// Client configuration.
///
/// Missing keys take their defaults, so a host application can load a
/// partial JSON or TOML table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Response deadline in milliseconds. Default: 100.
    pub timeout_ms: u64,
    /// Receive buffer capacity in bytes. Default: 256.
    pub rx_buffer_capacity: usize,
    /// Largest outbound payload. Default: 255 (short frames only).
    pub max_payload_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 100,
            rx_buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            max_payload_size: MAX_SHORT_PAYLOAD,
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn receiver_config(&self) -> ReceiverConfig {
        ReceiverConfig {
            buffer_capacity: self.rx_buffer_capacity,
            timeout: self.timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_receiver_defaults() {
        let config = ClientConfig::default();
        let receiver = config.receiver_config();
        let defaults = ReceiverConfig::default();
        assert_eq!(receiver.buffer_capacity, defaults.buffer_capacity);
        assert_eq!(receiver.timeout, defaults.timeout);
        assert_eq!(config.max_payload_size, 255);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"timeout_ms": 250}"#).unwrap();
        assert_eq!(config.timeout(), Duration::from_millis(250));
        assert_eq!(config.rx_buffer_capacity, 256);
        assert_eq!(config.max_payload_size, 255);
    }

    #[test]
    fn serializes_every_key() {
        let value = serde_json::to_value(ClientConfig::default()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "timeout_ms": 100,
                "rx_buffer_capacity": 256,
                "max_payload_size": 255
            })
        );
    }
}
