//! Relay server
//!
//! Binds the ingest and HTTP ports, runs the single-producer ingest loop in
//! a dedicated task and serves consumers with axum.

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::error::Result;
use crate::http::{self, EgressConfig};
use crate::ingest::IngestListener;
use crate::media::{FrameEncoder, JpegFrameEncoder};
use crate::server::config::{EgressMode, ServerConfig};
use crate::state::RelayState;

/// A bound relay, ready to run
pub struct Relay {
    config: ServerConfig,
    state: Arc<RelayState>,
    ingest: TcpListener,
    http: TcpListener,
}

impl Relay {
    /// Bind both ports
    ///
    /// In multipart mode payloads are encoded with [`JpegFrameEncoder`].
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let encoder: Option<Arc<dyn FrameEncoder>> = match config.egress {
            EgressMode::Progressive => None,
            EgressMode::Multipart => Some(Arc::new(JpegFrameEncoder::new(
                config.pixel_format,
                config.jpeg_quality,
            ))),
        };
        Self::bind_inner(config, encoder).await
    }

    /// Bind both ports, transcoding payloads with a custom encoder
    pub async fn bind_with_encoder(
        config: ServerConfig,
        encoder: Arc<dyn FrameEncoder>,
    ) -> Result<Self> {
        Self::bind_inner(config, Some(encoder)).await
    }

    async fn bind_inner(
        config: ServerConfig,
        encoder: Option<Arc<dyn FrameEncoder>>,
    ) -> Result<Self> {
        let fanout_config = config.fanout_config();
        let state = match encoder {
            Some(encoder) => RelayState::transcode(fanout_config, encoder),
            None => RelayState::relay(fanout_config),
        };

        let ingest = TcpListener::bind(config.ingest_addr).await?;
        let http = TcpListener::bind(config.http_addr).await?;

        Ok(Self {
            config,
            state: Arc::new(state),
            ingest,
            http,
        })
    }

    /// Shared state, for inspection
    pub fn state(&self) -> &Arc<RelayState> {
        &self.state
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Actual ingest address (useful when bound to port 0)
    pub fn ingest_addr(&self) -> Result<SocketAddr> {
        Ok(self.ingest.local_addr()?)
    }

    /// Actual HTTP address
    pub fn http_addr(&self) -> Result<SocketAddr> {
        Ok(self.http.local_addr()?)
    }

    /// Run until the HTTP server fails
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run until `shutdown` resolves
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let Relay {
            config,
            state,
            ingest,
            http,
        } = self;

        let ingest = IngestListener::from_listener(ingest, config.clone(), Arc::clone(&state));
        let ingest_handle = tokio::spawn(ingest.run());

        if let Ok(addr) = http.local_addr() {
            tracing::info!(addr = %addr, mode = ?config.egress, "HTTP server listening");
        }

        let app = http::router(state, EgressConfig::from(&config));
        let serve = axum::serve(
            http,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        );

        // Open streams never finish on their own, so shutdown drops the
        // server future instead of draining connections.
        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = serve.into_future() => result.map_err(Into::into),
        };

        ingest_handle.abort();

        result
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn loopback() -> ServerConfig {
        ServerConfig::default()
            .ingest("127.0.0.1:0".parse().unwrap())
            .http("127.0.0.1:0".parse().unwrap())
    }

    #[tokio::test]
    async fn test_consumer_settings_reach_fanout() {
        let relay = Relay::bind(loopback().idle_wait(Duration::from_millis(250)).queue_capacity(7))
            .await
            .unwrap();

        let fanout = relay.state().fanout.config();
        assert_eq!(fanout.idle_wait, Duration::from_millis(250));
        assert_eq!(fanout.queue_capacity, 7);
        assert!(!relay.state().is_transcoding());
    }

    #[tokio::test]
    async fn test_multipart_mode_transcodes() {
        let relay = Relay::bind(loopback().egress(EgressMode::Multipart)).await.unwrap();

        assert!(relay.state().is_transcoding());
        assert_ne!(relay.ingest_addr().unwrap().port(), 0);
        assert_ne!(relay.http_addr().unwrap().port(), 0);
    }
}
