//! Ingest statistics

pub mod metrics;

pub use metrics::{RelayStats, SessionStats};
