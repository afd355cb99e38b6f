//! Broadcast fan-out from the single producer to HTTP consumers
//!
//! Every consumer owns a bounded queue. Publishing is a non-blocking
//! `try_send` into each queue; a full queue means the consumer has stalled and
//! it is evicted from the registry instead of slowing the producer down.
//!
//! ```text
//!                         Arc<Fanout>
//!                ┌──────────────────────────┐
//!                │ subscribers: HashMap<Id, │
//!                │   mpsc::Sender<Bytes>    │
//!                │ >   (capacity 300 each)  │
//!                └────────────┬─────────────┘
//!                             │
//!        ┌────────────────────┼────────────────────┐
//!        │                    │                    │
//!        ▼                    ▼                    ▼
//!   [Ingest]           [Subscription]       [Subscription]
//!   publish()          rx.recv()            rx.recv()
//!        │                    │                    │
//!        └──► try_send ───────┴──► HTTP body ──► TCP
//! ```
//!
//! Chunks are `bytes::Bytes`, so every queue shares the same allocation.

pub mod config;
pub mod store;
pub mod subscription;

pub use config::FanoutConfig;
pub use store::{Fanout, PublishOutcome, SubscriberId};
pub use subscription::Subscription;
