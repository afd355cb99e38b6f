//! Upstream ingestion
//!
//! [`IngestListener`] owns the producer port and runs one [`IngestSession`]
//! at a time. Errors never leave a session: the listener logs them and goes
//! back to accepting.

pub mod listener;
pub mod session;

pub use listener::IngestListener;
pub use session::IngestSession;
