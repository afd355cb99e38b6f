//! Ingest frame decoder
//!
//! Reads [`Message`]s from an async byte stream. In the marked wire format a
//! bad marker triggers a byte-by-byte scan for the next `0xED 0x9E` pair:
//!
//! ```text
//!   .. 41 41 13 ED 9E 02 05 00 00 00 41 41 41 41 41
//!   └─ garbage ─┘ └───┘ │  └─ len ──┘ └─ payload ──┘
//!                marker type
//! ```
//!
//! The scan is bounded; running past the bound is treated as unrecoverable
//! corruption. Unknown type tags, oversized lengths and malformed dimensions
//! are never recovered from.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::DecodeError;

use super::constants::{DIMENSIONS_SIZE, MARKER, MAX_PAYLOAD_SIZE};
use super::message::{Dimensions, Message, MessageType};

/// Framing used by the producer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    /// Marker + type + length + payload, with resync
    #[default]
    Marked,
    /// Type + per-type body, no marker
    Plain,
}

/// Decoder limits
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    pub wire_format: WireFormat,

    /// Largest accepted declared length
    pub max_payload_size: usize,

    /// Most garbage bytes discarded while looking for a marker
    pub resync_limit: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            wire_format: WireFormat::Marked,
            max_payload_size: MAX_PAYLOAD_SIZE,
            resync_limit: MAX_PAYLOAD_SIZE,
        }
    }
}

impl DecoderConfig {
    pub fn with_format(wire_format: WireFormat) -> Self {
        Self {
            wire_format,
            ..Default::default()
        }
    }

    pub fn max_payload_size(mut self, max: usize) -> Self {
        self.max_payload_size = max;
        self
    }

    pub fn resync_limit(mut self, limit: usize) -> Self {
        self.resync_limit = limit;
        self
    }
}

/// Reads messages from one upstream connection
#[derive(Debug)]
pub struct FrameDecoder<R> {
    reader: R,
    config: DecoderConfig,
    resyncs: u64,
    bytes_read: u64,
}

impl<R: AsyncRead + Unpin> FrameDecoder<R> {
    pub fn new(reader: R, config: DecoderConfig) -> Self {
        Self {
            reader,
            config,
            resyncs: 0,
            bytes_read: 0,
        }
    }

    /// Number of successful resyncs on this stream
    pub fn resync_count(&self) -> u64 {
        self.resyncs
    }

    /// Total bytes consumed from the reader
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read the next complete message
    ///
    /// Never returns a partial message. `DecodeError::ConnectionClosed` means
    /// the peer went away; every other error means the stream is unusable.
    pub async fn next_message(&mut self) -> Result<Message, DecodeError> {
        match self.config.wire_format {
            WireFormat::Marked => self.next_marked().await,
            WireFormat::Plain => self.next_plain().await,
        }
    }

    async fn next_marked(&mut self) -> Result<Message, DecodeError> {
        let mut marker = [0u8; 2];
        self.read_exact(&mut marker).await?;

        if marker != MARKER {
            tracing::warn!(marker = ?marker, "Invalid marker, resyncing");
            let skipped = self.resync(marker[1]).await?;
            self.resyncs += 1;
            tracing::info!(skipped = skipped, "Resynchronized");
        }

        let tag = self.read_u8().await?;
        let size = self.read_u32_le().await?;
        self.check_size(size)?;

        match MessageType::from_u8(tag) {
            Some(MessageType::Dimensions) => {
                if size as usize != DIMENSIONS_SIZE {
                    return Err(DecodeError::InvalidDimensions { size });
                }
                self.read_dimensions().await
            }
            Some(MessageType::Configuration) => {
                Ok(Message::Configuration(self.read_payload(size).await?))
            }
            Some(MessageType::Payload) => Ok(Message::Payload(self.read_payload(size).await?)),
            None => Err(DecodeError::UnknownType(tag)),
        }
    }

    async fn next_plain(&mut self) -> Result<Message, DecodeError> {
        let tag = self.read_u8().await?;

        match MessageType::from_u8(tag) {
            Some(MessageType::Dimensions) => self.read_dimensions().await,
            Some(kind) => {
                let size = self.read_u32_le().await?;
                self.check_size(size)?;
                let data = self.read_payload(size).await?;
                if kind == MessageType::Configuration {
                    Ok(Message::Configuration(data))
                } else {
                    Ok(Message::Payload(data))
                }
            }
            None => Err(DecodeError::UnknownType(tag)),
        }
    }

    /// Scan for the marker, starting from the last byte of the rejected pair
    ///
    /// Seeding the scan with that byte means a marker split across the
    /// rejected pair (`.. ED | 9E ..`) is found. Scanners that start from a
    /// zero byte miss it and skip ahead to the next marker.
    ///
    /// Returns the number of garbage bytes discarded, counting the first byte
    /// of the rejected pair.
    async fn resync(&mut self, mut prev: u8) -> Result<usize, DecodeError> {
        let mut skipped = 1usize;

        loop {
            if skipped > self.config.resync_limit {
                tracing::warn!(scanned = skipped, "Unable to resynchronize");
                return Err(DecodeError::ResyncFailed { scanned: skipped });
            }

            let byte = self.read_u8().await?;
            if prev == MARKER[0] && byte == MARKER[1] {
                return Ok(skipped);
            }
            prev = byte;
            skipped += 1;
        }
    }

    fn check_size(&self, size: u32) -> Result<(), DecodeError> {
        if size as usize > self.config.max_payload_size {
            return Err(DecodeError::PayloadTooLarge {
                size,
                max: self.config.max_payload_size,
            });
        }
        Ok(())
    }

    async fn read_dimensions(&mut self) -> Result<Message, DecodeError> {
        let mut raw = [0u8; DIMENSIONS_SIZE];
        self.read_exact(&mut raw).await?;
        Ok(Message::Dimensions(Dimensions::from_le_bytes(raw)))
    }

    async fn read_payload(&mut self, size: u32) -> Result<Bytes, DecodeError> {
        if size == 0 {
            return Ok(Bytes::new());
        }
        let mut buf = BytesMut::zeroed(size as usize);
        self.read_exact(&mut buf).await?;
        Ok(buf.freeze())
    }

    async fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), DecodeError> {
        self.reader.read_exact(buf).await?;
        self.bytes_read += buf.len() as u64;
        Ok(())
    }

    async fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let mut b = [0u8; 1];
        self.read_exact(&mut b).await?;
        Ok(b[0])
    }

    async fn read_u32_le(&mut self) -> Result<u32, DecodeError> {
        let mut b = [0u8; 4];
        self.read_exact(&mut b).await?;
        Ok(u32::from_le_bytes(b))
    }
}
