//! Statistics for ingest sessions and the relay as a whole

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::protocol::Dimensions;

/// Per-connection statistics, owned by the ingest session
#[derive(Debug, Clone)]
pub struct SessionStats {
    pub started_at: Instant,
    /// Bytes consumed from the socket
    pub bytes_received: u64,
    /// Non-empty payload messages
    pub frames: u64,
    /// Non-empty configuration messages
    pub configs: u64,
    /// Zero-length messages that were ignored
    pub empty_messages: u64,
    /// Frames dropped before reaching consumers (transcoding failures)
    pub dropped_frames: u64,
    /// Successful marker resyncs
    pub resyncs: u64,
    pub last_frame_size: usize,
    pub dimensions: Option<Dimensions>,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            bytes_received: 0,
            frames: 0,
            configs: 0,
            empty_messages: 0,
            dropped_frames: 0,
            resyncs: 0,
            last_frame_size: 0,
            dimensions: None,
        }
    }

    pub fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Average bitrate in bits per second
    pub fn bitrate(&self) -> u64 {
        bitrate(self.bytes_received, self.duration())
    }

    pub fn framerate(&self) -> f64 {
        let secs = self.duration().as_secs_f64();
        if secs > 0.0 {
            self.frames as f64 / secs
        } else {
            0.0
        }
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

fn bitrate(bytes: u64, duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if secs > 0 {
        (bytes * 8) / secs
    } else {
        0
    }
}

/// Process-wide counters, updated by the ingest task
#[derive(Debug, Default)]
pub struct RelayStats {
    producer_sessions: AtomicU64,
    frames_relayed: AtomicU64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_producer_session(&self) {
        self.producer_sessions.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a frame that reached the fan-out or the latest-frame cell
    pub fn record_frame(&self) {
        self.frames_relayed.fetch_add(1, Ordering::Relaxed);
    }

    /// Producer connections accepted so far
    pub fn producer_sessions(&self) -> u64 {
        self.producer_sessions.load(Ordering::Relaxed)
    }

    pub fn frames_relayed(&self) -> u64 {
        self.frames_relayed.load(Ordering::Relaxed)
    }
}
