//! Consumer side of the fan-out

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_stream::Stream;

use super::store::{Fanout, SubscriberId};

/// A registered consumer queue
///
/// Dropping the subscription removes it from the registry, so every exit path
/// of a responder (normal end, write error, task cancellation) releases it.
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<Bytes>,
    fanout: Arc<Fanout>,
}

impl Subscription {
    pub(super) fn new(id: SubscriberId, rx: mpsc::Receiver<Bytes>, fanout: Arc<Fanout>) -> Self {
        Self { id, rx, fanout }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next chunk
    ///
    /// Returns `None` once the subscription was evicted and its queue drained.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    /// Take a queued chunk without waiting
    pub fn try_recv(&mut self) -> Option<Bytes> {
        self.rx.try_recv().ok()
    }

    /// Whether the registry still holds this queue
    pub fn is_active(&self) -> bool {
        self.fanout.is_subscribed(self.id)
    }
}

impl Stream for Subscription {
    type Item = Bytes;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Bytes>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.fanout.unsubscribe(self.id);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use tokio_stream::StreamExt;

    use super::*;

    #[tokio::test]
    async fn test_stream_yields_published_chunks() {
        let fanout = Arc::new(Fanout::new());
        let mut sub = fanout.subscribe();

        fanout.publish(Bytes::from_static(b"a"));
        fanout.publish(Bytes::from_static(b"b"));

        assert_eq!(sub.next().await, Some(Bytes::from_static(b"a")));
        assert_eq!(sub.next().await, Some(Bytes::from_static(b"b")));
        assert!(sub.is_active());
    }

    #[tokio::test]
    async fn test_stream_ends_after_unsubscribe() {
        let fanout = Arc::new(Fanout::new());
        let mut sub = fanout.subscribe();

        fanout.unsubscribe(sub.id());

        assert!(!sub.is_active());
        assert_eq!(sub.next().await, None);
    }
}
