pub mod config;
pub mod error;
pub mod fundraising;
pub mod telemetry;
