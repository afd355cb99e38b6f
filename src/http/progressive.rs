//! Progressive byte-stream responder
//!
//! Body layout: the stored configuration blob (if any), then every published
//! chunk verbatim, in publish order. The consumer is expected to parse the
//! same elementary-stream framing the producer emits.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio_stream::StreamExt;

use crate::state::RelayState;

use super::{ConsumerStream, EgressConfig};

/// Chunks for one consumer: stored configuration first, then the live feed
///
/// The subscription lives inside the returned stream; dropping the stream
/// unsubscribes. An empty queue is waited on for at most the fan-out's
/// `idle_wait` at a time, then polled again.
pub fn consumer_stream(relay: &Arc<RelayState>, peer: SocketAddr) -> ConsumerStream {
    // Subscribe before reading the store so a configuration landing in
    // between is queued rather than lost.
    let subscription = relay.fanout.subscribe();
    let subscriber = subscription.id();

    let initial = relay.config_store.get();
    if let Some(ref config) = initial {
        tracing::debug!(peer = %peer, size = config.len(), "Replaying stored configuration");
    }

    let live = subscription
        .timeout(relay.fanout.config().idle_wait)
        .filter_map(move |item| match item {
            Ok(chunk) => Some(chunk),
            Err(_) => {
                tracing::trace!(peer = %peer, "No data within idle wait");
                None
            }
        });

    ConsumerStream::new(tokio_stream::iter(initial).chain(live), peer, Some(subscriber))
}

/// Build the streaming response
pub fn respond(relay: &Arc<RelayState>, config: &EgressConfig, peer: SocketAddr) -> Response {
    let body = consumer_stream(relay, peer).map(Ok::<_, Infallible>);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, config.content_type.as_str())
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "close")
        .body(Body::from_stream(body))
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to build stream response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}
