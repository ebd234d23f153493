pub mod adjudication;
pub mod config;
pub mod error;
pub mod telemetry;
