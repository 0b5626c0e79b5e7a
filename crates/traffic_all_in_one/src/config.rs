use common::postgres::PostgresConfig;
use common::telemetry::TelemetryConfig;
use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use traffic_processor::domain::TrafficProcessorConfig;
use traffic_processor::mqtt::MqttSubscriberConfig;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // MQTT configuration
    #[serde(default = "default_mqtt_host")]
    pub mqtt_host: String,

    #[serde(default = "default_mqtt_port")]
    pub mqtt_port: u16,

    /// Comma-separated telemetry topics, one subscriber per topic
    #[serde(default = "default_mqtt_topics")]
    pub mqtt_topics: String,

    #[serde(default = "default_mqtt_client_id_prefix")]
    pub mqtt_client_id_prefix: String,

    #[serde(default = "default_mqtt_keep_alive_secs")]
    pub mqtt_keep_alive_secs: u64,

    #[serde(default = "default_mqtt_request_channel_capacity")]
    pub mqtt_request_channel_capacity: usize,

    #[serde(default = "default_mqtt_reconnect_initial_delay_ms")]
    pub mqtt_reconnect_initial_delay_ms: u64,

    #[serde(default = "default_mqtt_reconnect_max_delay_ms")]
    pub mqtt_reconnect_max_delay_ms: u64,

    // PostgreSQL configuration
    #[serde(default = "default_postgres_host")]
    pub postgres_host: String,

    #[serde(default = "default_postgres_port")]
    pub postgres_port: u16,

    #[serde(default = "default_postgres_database")]
    pub postgres_database: String,

    #[serde(default = "default_postgres_username")]
    pub postgres_username: String,

    #[serde(default = "default_postgres_password")]
    pub postgres_password: String,

    #[serde(default = "default_postgres_max_pool_size")]
    pub postgres_max_pool_size: usize,

    // Detector configuration
    /// Speed (km/h) that maps to a congestion score of 0
    #[serde(default = "default_free_flow_speed_kmh")]
    pub free_flow_speed_kmh: f64,

    /// Number of prior samples averaged by the anomaly check
    #[serde(default = "default_anomaly_window")]
    pub anomaly_window: usize,

    /// A reading below `factor * recent average` is an anomaly
    #[serde(default = "default_anomaly_drop_factor")]
    pub anomaly_drop_factor: f64,

    // Lifecycle
    /// Startup timeout for database initialization in seconds
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    /// How long in-flight messages may finish after a shutdown signal
    #[serde(default = "default_shutdown_drain_timeout_secs")]
    pub shutdown_drain_timeout_secs: u64,

    // OpenTelemetry configuration
    #[serde(default = "default_otel_endpoint")]
    pub otel_endpoint: String,

    #[serde(default = "default_otel_enabled")]
    pub otel_enabled: bool,

    #[serde(default = "default_otel_service_name")]
    pub otel_service_name: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

// MQTT defaults
fn default_mqtt_host() -> String {
    "localhost".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_mqtt_topics() -> String {
    "smart_traffic/intersection1".to_string()
}

fn default_mqtt_client_id_prefix() -> String {
    "traffic-processor".to_string()
}

fn default_mqtt_keep_alive_secs() -> u64 {
    60
}

fn default_mqtt_request_channel_capacity() -> usize {
    10
}

fn default_mqtt_reconnect_initial_delay_ms() -> u64 {
    1_000
}

fn default_mqtt_reconnect_max_delay_ms() -> u64 {
    30_000
}

// PostgreSQL defaults
fn default_postgres_host() -> String {
    "localhost".to_string()
}

fn default_postgres_port() -> u16 {
    5432
}

fn default_postgres_database() -> String {
    "traffic".to_string()
}

fn default_postgres_username() -> String {
    "traffic".to_string()
}

fn default_postgres_password() -> String {
    "traffic".to_string()
}

fn default_postgres_max_pool_size() -> usize {
    5
}

// Detector defaults
fn default_free_flow_speed_kmh() -> f64 {
    50.0
}

fn default_anomaly_window() -> usize {
    20
}

fn default_anomaly_drop_factor() -> f64 {
    0.6
}

fn default_startup_timeout_secs() -> u64 {
    30
}

fn default_shutdown_drain_timeout_secs() -> u64 {
    10
}

// OpenTelemetry defaults
fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_otel_enabled() -> bool {
    false
}

fn default_otel_service_name() -> String {
    "traffic-all-in-one".to_string()
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("TRAFFIC"))
            .build()?
            .try_deserialize()
    }

    pub fn topics(&self) -> Vec<String> {
        self.mqtt_topics
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            service_name: self.otel_service_name.clone(),
            otel_endpoint: self.otel_endpoint.clone(),
            otel_enabled: self.otel_enabled,
            log_level: self.log_level.clone(),
        }
    }

    pub fn postgres_config(&self) -> PostgresConfig {
        PostgresConfig {
            host: self.postgres_host.clone(),
            port: self.postgres_port,
            database: self.postgres_database.clone(),
            username: self.postgres_username.clone(),
            password: self.postgres_password.clone(),
            max_pool_size: self.postgres_max_pool_size,
        }
    }

    pub fn mqtt_config(&self) -> MqttSubscriberConfig {
        MqttSubscriberConfig {
            host: self.mqtt_host.clone(),
            port: self.mqtt_port,
            client_id_prefix: self.mqtt_client_id_prefix.clone(),
            keep_alive_secs: self.mqtt_keep_alive_secs,
            request_channel_capacity: self.mqtt_request_channel_capacity,
            reconnect_initial_delay_ms: self.mqtt_reconnect_initial_delay_ms,
            reconnect_max_delay_ms: self.mqtt_reconnect_max_delay_ms,
        }
    }

    pub fn processor_config(&self) -> TrafficProcessorConfig {
        TrafficProcessorConfig {
            free_flow_speed_kmh: self.free_flow_speed_kmh,
            anomaly_window: self.anomaly_window,
            anomaly_drop_factor: self.anomaly_drop_factor,
        }
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn shutdown_drain_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_drain_timeout_secs)
    }
}
