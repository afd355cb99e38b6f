//! Producer-side client
//!
//! Connects to a relay's ingest port and sends dimensions, configuration and
//! frame messages. Handy for feeding a relay from another process and for
//! end-to-end tests.

pub mod publisher;

pub use publisher::{PublishEvent, Publisher, PublisherConfig};
