pub mod domain;
pub mod postgres;
pub mod telemetry;

pub use domain::*;
pub use postgres::*;
