mod alert;
mod congestion;
mod in_memory_telemetry_store;
mod result;
mod telemetry_store;
mod traffic_sample;

pub use alert::*;
pub use congestion::*;
pub use in_memory_telemetry_store::*;
pub use result::*;
pub use telemetry_store::*;
pub use traffic_sample::*;
