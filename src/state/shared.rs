//! State shared by the ingest session and HTTP responders

use std::sync::Arc;

use crate::fanout::{Fanout, FanoutConfig};
use crate::media::FrameEncoder;
use crate::stats::RelayStats;

use super::config_store::ConfigStore;
use super::latest_frame::LatestFrameCell;

/// Everything the two sides of the relay exchange
///
/// Built once at startup and handed around as `Arc<RelayState>`.
pub struct RelayState {
    pub config_store: ConfigStore,
    pub fanout: Arc<Fanout>,
    pub latest_frame: LatestFrameCell,
    pub stats: RelayStats,
    /// Present in the transcoding variant only
    encoder: Option<Arc<dyn FrameEncoder>>,
}

impl RelayState {
    /// State for relaying payloads verbatim
    pub fn relay(fanout_config: FanoutConfig) -> Self {
        Self {
            config_store: ConfigStore::new(),
            fanout: Arc::new(Fanout::with_config(fanout_config)),
            latest_frame: LatestFrameCell::new(),
            stats: RelayStats::new(),
            encoder: None,
        }
    }

    /// State for transcoding payloads into the latest-frame cell
    pub fn transcode(fanout_config: FanoutConfig, encoder: Arc<dyn FrameEncoder>) -> Self {
        Self {
            encoder: Some(encoder),
            ..Self::relay(fanout_config)
        }
    }

    pub fn encoder(&self) -> Option<&Arc<dyn FrameEncoder>> {
        self.encoder.as_ref()
    }

    pub fn is_transcoding(&self) -> bool {
        self.encoder.is_some()
    }
}

impl std::fmt::Debug for RelayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayState")
            .field("subscribers", &self.fanout.subscriber_count())
            .field("has_config", &self.config_store.is_set())
            .field("transcoding", &self.is_transcoding())
            .finish()
    }
}
