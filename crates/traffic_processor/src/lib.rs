pub mod domain;
pub mod mqtt;
pub mod traffic_processor;

pub use traffic_processor::TrafficProcessor;
