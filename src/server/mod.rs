//! Relay server: configuration and the process-level runner

pub mod config;
pub mod relay;

pub use config::{EgressMode, ServerConfig};
pub use relay::Relay;
