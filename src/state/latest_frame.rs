//! Latest encoded frame for the transcoding variant
//!
//! A single slot overwritten on every decoded frame. Readers poll it at their
//! own pace and may see the same frame twice or miss some; nothing queues.

use std::sync::RwLock;
use std::time::Instant;

use bytes::Bytes;

use crate::protocol::Dimensions;

/// One encoded image plus the raw pixels it came from
#[derive(Debug, Clone)]
pub struct LatestFrame {
    /// Encoded image (JPEG)
    pub encoded: Bytes,
    /// Raw pixels as received
    pub raw: Bytes,
    pub dimensions: Dimensions,
    /// Monotonic counter, starts at 1
    pub sequence: u64,
    pub updated_at: Instant,
}

/// Shared single-slot frame holder
#[derive(Debug, Default)]
pub struct LatestFrameCell {
    slot: RwLock<Option<LatestFrame>>,
}

impl LatestFrameCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the slot; returns the new frame's sequence number
    pub fn store(&self, encoded: Bytes, raw: Bytes, dimensions: Dimensions) -> u64 {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        let sequence = slot.as_ref().map_or(1, |f| f.sequence + 1);
        *slot = Some(LatestFrame {
            encoded,
            raw,
            dimensions,
            sequence,
            updated_at: Instant::now(),
        });
        sequence
    }

    pub fn latest(&self) -> Option<LatestFrame> {
        self.slot.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Encoded bytes only, for the multipart responder
    pub fn latest_encoded(&self) -> Option<Bytes> {
        self.slot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|f| f.encoded.clone())
    }
}
