//! Single-producer video relay
//!
//! Bridges one upstream producer, speaking a small length-prefixed binary
//! protocol over TCP, to any number of HTTP consumers.
//!
//! ```text
//!  producer ──TCP──► FrameDecoder ──┬─► ConfigStore ──────────┐
//!                                   ├─► Fanout ──► queue ×N ──┼─► HTTP (video/h264)
//!                                   └─► LatestFrameCell ──────┴─► HTTP (multipart JPEG)
//! ```
//!
//! The producer is never slowed down by consumers: publishing into a
//! consumer queue is non-blocking, and a consumer whose queue fills up is
//! dropped.
//!
//! # Example
//! ```no_run
//! use frame_relay::{Relay, ServerConfig};
//!
//! # async fn example() -> frame_relay::error::Result<()> {
//! let relay = Relay::bind(ServerConfig::default()).await?;
//! relay.run().await
//! # }
//! ```

pub mod client;
pub mod error;
pub mod fanout;
pub mod http;
pub mod ingest;
pub mod media;
pub mod protocol;
pub mod server;
pub mod state;
pub mod stats;

pub use error::{DecodeError, Error, Result};
pub use fanout::{Fanout, Subscription};
pub use protocol::{Message, WireFormat};
pub use server::{EgressMode, Relay, ServerConfig};
pub use state::{ConfigStore, LatestFrameCell, RelayState};
