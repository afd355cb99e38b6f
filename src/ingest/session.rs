//! One upstream producer connection
//!
//! Drives the [`FrameDecoder`] and routes each message:
//!
//! | Message       | Relay mode                     | Transcoding mode              |
//! |---------------|--------------------------------|-------------------------------|
//! | Dimensions    | recorded                       | recorded, shapes raw payloads |
//! | Configuration | stored + published             | stored + published            |
//! | Payload       | published verbatim             | encoded into latest-frame cell|
//!
//! Zero-length configuration and payload messages are ignored.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::AsyncRead;

use crate::error::DecodeError;
use crate::protocol::{DecoderConfig, Dimensions, FrameDecoder, Message};
use crate::state::RelayState;
use crate::stats::SessionStats;

/// Handles a single producer connection until it closes or misbehaves
pub struct IngestSession<R> {
    decoder: FrameDecoder<R>,
    state: Arc<RelayState>,
    peer_addr: SocketAddr,
    stats: SessionStats,
    progress_interval: u64,
}

impl<R: AsyncRead + Unpin> IngestSession<R> {
    pub fn new(
        reader: R,
        peer_addr: SocketAddr,
        decoder_config: DecoderConfig,
        state: Arc<RelayState>,
    ) -> Self {
        Self {
            decoder: FrameDecoder::new(reader, decoder_config),
            state,
            peer_addr,
            stats: SessionStats::new(),
            progress_interval: 30,
        }
    }

    /// Log a progress line every `frames` payloads (0 disables)
    pub fn progress_interval(mut self, frames: u64) -> Self {
        self.progress_interval = frames;
        self
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Last dimensions announced on this connection
    pub fn dimensions(&self) -> Option<Dimensions> {
        self.stats.dimensions
    }

    /// Process messages until the stream ends
    ///
    /// A peer close returns `Ok`; anything else is a protocol or I/O fault
    /// that ends this connection only.
    pub async fn run(&mut self) -> Result<(), DecodeError> {
        loop {
            let result = self.decoder.next_message().await;
            self.stats.bytes_received = self.decoder.bytes_read();
            self.stats.resyncs = self.decoder.resync_count();

            match result {
                Ok(msg) => self.handle_message(msg).await,
                Err(e) if e.is_closed() => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    /// Apply one decoded message to the shared state
    pub async fn handle_message(&mut self, msg: Message) {
        if msg.is_empty() {
            self.stats.empty_messages += 1;
            tracing::debug!(
                peer = %self.peer_addr,
                kind = ?msg.message_type(),
                "Empty message ignored"
            );
            return;
        }

        match msg {
            Message::Dimensions(dims) => {
                tracing::info!(
                    peer = %self.peer_addr,
                    width = dims.width,
                    height = dims.height,
                    "Dimensions received"
                );
                self.stats.dimensions = Some(dims);
            }
            Message::Configuration(config) => {
                let size = config.len();
                self.state.config_store.set(config.clone());
                let outcome = self.state.fanout.publish(config);
                self.stats.configs += 1;

                tracing::info!(
                    peer = %self.peer_addr,
                    size = size,
                    subscribers = outcome.delivered,
                    "Configuration received"
                );
            }
            Message::Payload(data) => {
                let size = data.len();
                let relayed = if self.state.is_transcoding() {
                    self.transcode(data).await
                } else {
                    let outcome = self.state.fanout.publish(data);
                    tracing::trace!(size = size, subscribers = outcome.delivered, "Frame published");
                    true
                };

                self.stats.frames += 1;
                self.stats.last_frame_size = size;
                if relayed {
                    self.state.stats.record_frame();
                }

                if self.progress_interval > 0 && self.stats.frames % self.progress_interval == 0 {
                    tracing::info!(
                        peer = %self.peer_addr,
                        frames = self.stats.frames,
                        last_size = size,
                        subscribers = self.state.fanout.subscriber_count(),
                        "Frames received"
                    );
                }
            }
        }
    }

    /// Encode a raw frame into the latest-frame cell; false if it was dropped
    async fn transcode(&mut self, raw: Bytes) -> bool {
        let Some(encoder) = self.state.encoder().cloned() else {
            return false;
        };
        let Some(dims) = self.stats.dimensions else {
            self.stats.dropped_frames += 1;
            tracing::warn!(peer = %self.peer_addr, "Frame before dimensions, dropped");
            return false;
        };

        // JPEG encoding is CPU-bound; keep it off the reactor threads
        let input = raw.clone();
        let encoded = tokio::task::spawn_blocking(move || encoder.encode(&input, dims)).await;

        match encoded {
            Ok(Ok(jpeg)) => {
                let sequence = self.state.latest_frame.store(jpeg, raw, dims);
                tracing::trace!(sequence = sequence, "Latest frame updated");
                true
            }
            Ok(Err(e)) => {
                self.stats.dropped_frames += 1;
                tracing::warn!(peer = %self.peer_addr, error = %e, "Frame encoding failed, dropped");
                false
            }
            Err(e) => {
                self.stats.dropped_frames += 1;
                tracing::error!(error = %e, "Encoder task failed");
                false
            }
        }
    }
}
