//! Upstream accept loop
//!
//! The protocol carries no stream identifier, so only one producer can be
//! served at a time. Each connection is handled inline: the next `accept`
//! happens only after the previous session has fully ended.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};

use crate::error::Result;
use crate::server::config::ServerConfig;
use crate::state::RelayState;

use super::session::IngestSession;

/// Accepts producer connections one at a time
pub struct IngestListener {
    listener: TcpListener,
    config: ServerConfig,
    state: Arc<RelayState>,
}

impl IngestListener {
    /// Bind to `config.ingest_addr`
    pub async fn bind(config: ServerConfig, state: Arc<RelayState>) -> Result<Self> {
        let listener = TcpListener::bind(config.ingest_addr).await?;
        Ok(Self::from_listener(listener, config, state))
    }

    pub fn from_listener(listener: TcpListener, config: ServerConfig, state: Arc<RelayState>) -> Self {
        Self {
            listener,
            config,
            state,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the accept loop forever
    pub async fn run(self) {
        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!(addr = %addr, "Waiting for producer");
        }

        loop {
            match self.listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr).await;
                    tracing::info!("Producer connection closed, waiting for a new one");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept producer connection");
                }
            }
        }
    }

    async fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        tracing::info!(peer = %peer_addr, "Producer connected");
        self.state.stats.record_producer_session();

        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(error = %e, "Failed to configure socket");
            return;
        }

        let mut session = IngestSession::new(
            socket,
            peer_addr,
            self.config.decoder_config(),
            Arc::clone(&self.state),
        )
        .progress_interval(self.config.progress_interval);

        match session.run().await {
            Ok(()) => {
                tracing::info!(peer = %peer_addr, "Producer disconnected");
            }
            Err(e) => {
                tracing::warn!(peer = %peer_addr, error = %e, "Producer connection aborted");
            }
        }

        let stats = session.stats();
        tracing::debug!(
            peer = %peer_addr,
            frames = stats.frames,
            configs = stats.configs,
            bytes = stats.bytes_received,
            resyncs = stats.resyncs,
            dropped = stats.dropped_frames,
            bitrate = stats.bitrate(),
            "Session summary"
        );
        // socket dropped with the session, closing the connection
    }

    fn configure_socket(&self, socket: &TcpStream) -> std::io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }
}
