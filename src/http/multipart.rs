//! Multipart JPEG responder (transcoding variant)
//!
//! Each part:
//!
//! ```text
//! --frame\r\n
//! Content-Type: image/jpeg\r\n
//! Content-Length: <n>\r\n
//! \r\n
//! <n bytes>\r\n
//! ```
//!
//! The latest-frame cell is sampled on a fixed tick, so consumers get at most
//! one part per tick whatever the producer's frame rate.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::{BufMut, Bytes, BytesMut};
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

use crate::state::RelayState;

use super::{ConsumerStream, EgressConfig};

/// Multipart boundary token
pub const BOUNDARY: &str = "frame";

/// Wrap one encoded image as a multipart part
pub fn encode_part(image: &[u8], content_type: &str) -> Bytes {
    let head = format!(
        "--{boundary}\r\nContent-Type: {content_type}\r\nContent-Length: {len}\r\n\r\n",
        boundary = BOUNDARY,
        content_type = content_type,
        len = image.len()
    );

    let mut part = BytesMut::with_capacity(head.len() + image.len() + 2);
    part.put_slice(head.as_bytes());
    part.put_slice(image);
    part.put_slice(b"\r\n");
    part.freeze()
}

/// Parts for one consumer, sampled every `interval`
///
/// Ticks with no frame in the cell yet produce nothing; the consumer just
/// waits for the next tick.
pub fn part_stream(
    relay: Arc<RelayState>,
    interval: Duration,
    peer: SocketAddr,
) -> ConsumerStream {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let content_type = relay
        .encoder()
        .map_or("image/jpeg", |encoder| encoder.content_type());

    let parts = IntervalStream::new(ticker).filter_map(move |_| {
        relay
            .latest_frame
            .latest_encoded()
            .map(|image| encode_part(&image, content_type))
    });

    ConsumerStream::new(parts, peer, None)
}

/// Build the multipart response
pub fn respond(relay: Arc<RelayState>, config: &EgressConfig, peer: SocketAddr) -> Response {
    let body = part_stream(relay, config.frame_interval, peer).map(Ok::<_, Infallible>);

    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/x-mixed-replace; boundary={BOUNDARY}"),
        )
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(body))
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to build multipart response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fanout::FanoutConfig;
    use crate::protocol::Dimensions;

    fn peer() -> SocketAddr {
        "127.0.0.1:50001".parse().unwrap()
    }

    #[test]
    fn test_encode_part() {
        let part = encode_part(b"JPEGDATA", "image/jpeg");

        assert_eq!(
            &part[..],
            &b"--frame\r\nContent-Type: image/jpeg\r\nContent-Length: 8\r\n\r\nJPEGDATA\r\n"[..]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_first_frame() {
        let relay = Arc::new(RelayState::relay(FanoutConfig::default()));

        let stream = part_stream(Arc::clone(&relay), Duration::from_millis(33), peer());
        tokio::pin!(stream);

        let writer = Arc::clone(&relay);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            writer
                .latest_frame
                .store(Bytes::from_static(b"img"), Bytes::new(), Dimensions::new(1, 1));
        });

        let part = stream.next().await.unwrap();
        assert!(part.ends_with(b"img\r\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeats_latest_frame() {
        let relay = Arc::new(RelayState::relay(FanoutConfig::default()));
        relay
            .latest_frame
            .store(Bytes::from_static(b"one"), Bytes::new(), Dimensions::new(1, 1));

        let stream = part_stream(Arc::clone(&relay), Duration::from_millis(33), peer());
        tokio::pin!(stream);

        let first = stream.next().await.unwrap();
        let second = stream.next().await.unwrap();
        assert_eq!(first, second);

        relay
            .latest_frame
            .store(Bytes::from_static(b"two"), Bytes::new(), Dimensions::new(1, 1));
        let third = stream.next().await.unwrap();
        assert!(third.ends_with(b"two\r\n"));
    }

    #[tokio::test]
    async fn test_response_headers() {
        let relay = Arc::new(RelayState::relay(FanoutConfig::default()));
        let config = EgressConfig::from(&crate::server::ServerConfig::default());

        let response = respond(relay, &config, peer());

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "multipart/x-mixed-replace; boundary=frame"
        );
    }
}
