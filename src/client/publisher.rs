//! Ingest publisher
//!
//! Writes messages to a relay's ingest port in either wire format.

use std::net::SocketAddr;

use bytes::{Bytes, BytesMut};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::protocol::{encode_message, Dimensions, Message, WireFormat};

/// Events from the publisher
#[derive(Debug)]
pub enum PublishEvent {
    /// TCP connection established
    Connected,

    /// A write failed; the connection has been dropped
    Error(String),

    /// Disconnected
    Disconnected,
}

/// Publisher configuration
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Relay ingest address
    pub addr: SocketAddr,
    pub wire_format: WireFormat,
    pub tcp_nodelay: bool,
}

impl PublisherConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            wire_format: WireFormat::Marked,
            tcp_nodelay: true,
        }
    }

    pub fn wire_format(mut self, format: WireFormat) -> Self {
        self.wire_format = format;
        self
    }
}

/// Sends a producer stream to a relay
///
/// # Example
/// ```no_run
/// use frame_relay::client::{Publisher, PublisherConfig};
///
/// # async fn example() -> frame_relay::error::Result<()> {
/// let config = PublisherConfig::new("127.0.0.1:9999".parse().unwrap());
/// let (mut publisher, _events) = Publisher::new(config);
///
/// publisher.connect().await?;
/// publisher.send_dimensions(1280, 720).await?;
/// publisher.send_configuration(&[0, 0, 0, 1, 0x67]).await?;
/// publisher.send_frame(&[0, 0, 0, 1, 0x65]).await?;
/// # Ok(())
/// # }
/// ```
pub struct Publisher {
    config: PublisherConfig,
    event_tx: mpsc::Sender<PublishEvent>,
    stream: Option<TcpStream>,
    buf: BytesMut,
}

impl Publisher {
    /// Create a new publisher.
    ///
    /// Returns the publisher and a receiver for events.
    pub fn new(config: PublisherConfig) -> (Self, mpsc::Receiver<PublishEvent>) {
        let (tx, rx) = mpsc::channel(16);

        let publisher = Self {
            config,
            event_tx: tx,
            stream: None,
            buf: BytesMut::with_capacity(64 * 1024),
        };

        (publisher, rx)
    }

    /// Connect to the relay
    pub async fn connect(&mut self) -> Result<()> {
        let stream = TcpStream::connect(self.config.addr).await?;
        if self.config.tcp_nodelay {
            stream.set_nodelay(true)?;
        }

        tracing::debug!(addr = %self.config.addr, "Publisher connected");
        self.stream = Some(stream);
        let _ = self.event_tx.try_send(PublishEvent::Connected);
        Ok(())
    }

    /// Announce frame geometry
    pub async fn send_dimensions(&mut self, width: i32, height: i32) -> Result<()> {
        self.send(&Message::Dimensions(Dimensions::new(width, height))).await
    }

    /// Send decoder configuration (e.g. SPS/PPS)
    pub async fn send_configuration(&mut self, data: &[u8]) -> Result<()> {
        self.send(&Message::Configuration(Bytes::copy_from_slice(data))).await
    }

    /// Send one frame payload
    pub async fn send_frame(&mut self, data: &[u8]) -> Result<()> {
        self.send(&Message::Payload(Bytes::copy_from_slice(data))).await
    }

    /// Send raw bytes outside the message framing
    ///
    /// Only useful for exercising the relay's resync path.
    pub async fn send_raw(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        stream.write_all(data).await?;
        Ok(())
    }

    /// Encode and write one message
    pub async fn send(&mut self, msg: &Message) -> Result<()> {
        self.buf.clear();
        encode_message(msg, self.config.wire_format, &mut self.buf)?;

        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        if let Err(e) = stream.write_all(&self.buf).await {
            tracing::warn!(error = %e, kind = ?msg.message_type(), "Send failed");
            self.stream = None;
            let _ = self.event_tx.try_send(PublishEvent::Error(e.to_string()));
            return Err(e.into());
        }

        Ok(())
    }

    /// Close the connection
    pub async fn disconnect(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
            let _ = self.event_tx.try_send(PublishEvent::Disconnected);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;
    use crate::protocol::{DecoderConfig, FrameDecoder};

    #[tokio::test]
    async fn test_send_before_connect() {
        let (mut publisher, _events) =
            Publisher::new(PublisherConfig::new("127.0.0.1:1".parse().unwrap()));

        let result = publisher.send_frame(b"x").await;
        assert!(matches!(result, Err(Error::NotConnected)));
        assert!(!publisher.is_connected());
    }

    #[tokio::test]
    async fn test_publisher_messages_decode() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut decoder = FrameDecoder::new(socket, DecoderConfig::default());
            let mut messages = Vec::new();
            while let Ok(msg) = decoder.next_message().await {
                messages.push(msg);
            }
            messages
        });

        let (mut publisher, mut events) = Publisher::new(PublisherConfig::new(addr));
        publisher.connect().await.unwrap();
        publisher.send_dimensions(640, 480).await.unwrap();
        publisher.send_configuration(b"cfg").await.unwrap();
        publisher.send_frame(b"frame").await.unwrap();
        publisher.disconnect().await;

        let messages = server.await.unwrap();
        assert_eq!(
            messages,
            vec![
                Message::Dimensions(Dimensions::new(640, 480)),
                Message::Configuration(Bytes::from_static(b"cfg")),
                Message::Payload(Bytes::from_static(b"frame")),
            ]
        );

        assert!(matches!(events.recv().await, Some(PublishEvent::Connected)));
        assert!(matches!(events.recv().await, Some(PublishEvent::Disconnected)));
    }
}
