//! Shared state written by the ingest session and read by HTTP responders
//!
//! Each cell is an owned object with its own lock; there are no globals.

pub mod config_store;
pub mod latest_frame;
pub mod shared;

pub use config_store::ConfigStore;
pub use latest_frame::{LatestFrame, LatestFrameCell};
pub use shared::RelayState;
