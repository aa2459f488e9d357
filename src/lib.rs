pub mod client;
pub mod common;
pub mod config;
pub mod telemetry;
pub mod test_utils;
