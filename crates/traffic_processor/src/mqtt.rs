mod backoff;
pub(crate) mod subscriber;
mod subscriber_config;
mod topic;

pub use backoff::ReconnectBackoff;
pub use subscriber::run_mqtt_subscriber;
pub use subscriber_config::MqttSubscriberConfig;
pub use topic::{parse_topic, ParsedTopic};
