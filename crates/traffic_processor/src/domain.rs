mod anomaly_detector;
mod ingestion_service;
mod processor_config;
mod telemetry_decoder;

pub use anomaly_detector::*;
pub use ingestion_service::*;
pub use processor_config::*;
pub use telemetry_decoder::*;
