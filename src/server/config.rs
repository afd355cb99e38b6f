//! Relay configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::fanout::config::DEFAULT_QUEUE_CAPACITY;
use crate::fanout::FanoutConfig;
use crate::media::PixelFormat;
use crate::protocol::constants::{DEFAULT_HTTP_PORT, DEFAULT_INGEST_PORT, MAX_PAYLOAD_SIZE};
use crate::protocol::{DecoderConfig, WireFormat};

/// How HTTP consumers are served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EgressMode {
    /// Payloads relayed verbatim as one unbounded byte stream
    #[default]
    Progressive,
    /// Payloads transcoded to JPEG and served as `multipart/x-mixed-replace`
    Multipart,
}

/// Relay configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address for the upstream producer
    pub ingest_addr: SocketAddr,

    /// Address for HTTP consumers
    pub http_addr: SocketAddr,

    pub egress: EgressMode,

    /// Framing the producer uses
    pub wire_format: WireFormat,

    /// Largest accepted message payload
    pub max_payload_size: usize,

    /// Most bytes scanned while resyncing before the connection is dropped
    pub resync_limit: usize,

    /// Per-consumer queue capacity (progressive mode)
    pub queue_capacity: usize,

    /// Bounded wait on an empty consumer queue
    pub idle_wait: Duration,

    /// Multipart polling period (~30 fps)
    pub frame_interval: Duration,

    /// Enable TCP_NODELAY on accepted sockets
    pub tcp_nodelay: bool,

    /// Content-Type of the progressive stream
    pub content_type: String,

    /// Raw pixel layout in multipart mode
    pub pixel_format: PixelFormat,

    /// JPEG quality in multipart mode (1-100)
    pub jpeg_quality: u8,

    /// Log a progress line every N frames
    pub progress_interval: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ingest_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_INGEST_PORT)),
            http_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_HTTP_PORT)),
            egress: EgressMode::Progressive,
            wire_format: WireFormat::Marked,
            max_payload_size: MAX_PAYLOAD_SIZE,
            resync_limit: MAX_PAYLOAD_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            idle_wait: Duration::from_secs(5),
            frame_interval: Duration::from_millis(33),
            tcp_nodelay: true,
            content_type: "video/h264".to_string(),
            pixel_format: PixelFormat::Rgba8,
            jpeg_quality: 80,
            progress_interval: 30,
        }
    }
}

impl ServerConfig {
    /// Set the ingest address
    pub fn ingest(mut self, addr: SocketAddr) -> Self {
        self.ingest_addr = addr;
        self
    }

    /// Set the HTTP address
    pub fn http(mut self, addr: SocketAddr) -> Self {
        self.http_addr = addr;
        self
    }

    pub fn egress(mut self, mode: EgressMode) -> Self {
        self.egress = mode;
        self
    }

    pub fn wire_format(mut self, format: WireFormat) -> Self {
        self.wire_format = format;
        self
    }

    /// Set the per-consumer queue capacity (at least 1)
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn idle_wait(mut self, wait: Duration) -> Self {
        self.idle_wait = wait;
        self
    }

    pub fn frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    pub fn resync_limit(mut self, limit: usize) -> Self {
        self.resync_limit = limit;
        self
    }

    pub fn pixel_format(mut self, format: PixelFormat) -> Self {
        self.pixel_format = format;
        self
    }

    /// Set JPEG quality, capped to 1-100
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig::with_format(self.wire_format)
            .max_payload_size(self.max_payload_size)
            .resync_limit(self.resync_limit)
    }

    pub fn fanout_config(&self) -> FanoutConfig {
        FanoutConfig::default()
            .queue_capacity(self.queue_capacity)
            .idle_wait(self.idle_wait)
    }
}
