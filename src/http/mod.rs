//! HTTP egress
//!
//! A single GET route. What it serves depends on the configured
//! [`EgressMode`]:
//!
//! - progressive: `video/h264` byte stream fed by a fan-out subscription
//! - multipart: `multipart/x-mixed-replace` JPEG parts polled from the
//!   latest-frame cell
//!
//! Each consumer runs in its own hyper connection task. A consumer that goes
//! away is noticed when the next write fails; hyper then drops the body
//! stream, and with it the fan-out subscription.

pub mod multipart;
pub mod progressive;

use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use tokio_stream::Stream;

use crate::fanout::SubscriberId;
use crate::server::config::{EgressMode, ServerConfig};
use crate::state::RelayState;

/// Per-router settings shared by every request
#[derive(Debug, Clone)]
pub struct EgressConfig {
    pub mode: EgressMode,
    pub content_type: String,
    pub frame_interval: Duration,
}

impl From<&ServerConfig> for EgressConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            mode: config.egress,
            content_type: config.content_type.clone(),
            frame_interval: config.frame_interval,
        }
    }
}

#[derive(Clone)]
struct HttpState {
    relay: Arc<RelayState>,
    config: Arc<EgressConfig>,
}

/// Build the egress router
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()`; the
/// handler logs the consumer address.
pub fn router(relay: Arc<RelayState>, config: EgressConfig) -> Router {
    let state = HttpState {
        relay,
        config: Arc::new(config),
    };

    Router::new()
        .route("/", get(stream))
        .route("/*path", get(stream))
        .with_state(state)
}

async fn stream(
    State(state): State<HttpState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Response {
    match state.config.mode {
        EgressMode::Progressive => {
            tracing::info!(peer = %peer, "Stream consumer connected");
            progressive::respond(&state.relay, &state.config, peer)
        }
        EgressMode::Multipart => {
            tracing::info!(peer = %peer, "Multipart consumer connected");
            multipart::respond(Arc::clone(&state.relay), &state.config, peer)
        }
    }
}

/// Response body for one consumer
///
/// hyper drops the body once the client is gone, so dropping this is where
/// a disconnect gets logged.
pub struct ConsumerStream {
    inner: Pin<Box<dyn Stream<Item = Bytes> + Send>>,
    peer: SocketAddr,
    subscriber: Option<SubscriberId>,
}

impl ConsumerStream {
    pub fn new(
        inner: impl Stream<Item = Bytes> + Send + 'static,
        peer: SocketAddr,
        subscriber: Option<SubscriberId>,
    ) -> Self {
        Self {
            inner: Box::pin(inner),
            peer,
            subscriber,
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

impl Stream for ConsumerStream {
    type Item = Bytes;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Bytes>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Drop for ConsumerStream {
    fn drop(&mut self) {
        match self.subscriber {
            Some(id) => tracing::info!(peer = %self.peer, subscriber = id, "Consumer disconnected"),
            None => tracing::info!(peer = %self.peer, "Consumer disconnected"),
        }
    }
}
