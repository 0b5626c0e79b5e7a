use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Broker connection settings shared by every topic subscriber
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttSubscriberConfig {
    pub host: String,
    pub port: u16,

    /// Client ids are `{prefix}-{topic}` with non-alphanumerics replaced
    pub client_id_prefix: String,

    pub keep_alive_secs: u64,

    /// Capacity of the rumqttc request channel
    pub request_channel_capacity: usize,

    /// First reconnect delay (default: 1 second)
    pub reconnect_initial_delay_ms: u64,

    /// Upper bound for the reconnect delay (default: 30 seconds)
    pub reconnect_max_delay_ms: u64,
}

impl Default for MqttSubscriberConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id_prefix: "traffic-processor".to_string(),
            keep_alive_secs: 60,
            request_channel_capacity: 10,
            reconnect_initial_delay_ms: 1_000,
            reconnect_max_delay_ms: 30_000,
        }
    }
}

impl MqttSubscriberConfig {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn reconnect_initial_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_initial_delay_ms)
    }

    pub fn reconnect_max_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_delay_ms)
    }

    pub fn client_id_for(&self, topic: &str) -> String {
        let suffix: String = topic
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        format!("{}-{}", self.client_id_prefix, suffix)
    }
}
