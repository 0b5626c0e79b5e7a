mod client;
mod config;
mod schema;
mod telemetry_store;

pub use client::*;
pub use config::*;
pub use schema::*;
pub use telemetry_store::*;
