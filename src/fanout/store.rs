//! Fan-out registry implementation

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::config::FanoutConfig;
use super::subscription::Subscription;

/// Identifier of one consumer queue
pub type SubscriberId = u64;

/// Result of a single publish call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    /// Queues that accepted the chunk
    pub delivered: usize,
    /// Queues removed because they were full or abandoned
    pub evicted: usize,
}

/// Registry of per-consumer bounded queues
///
/// All mutation goes through one `Mutex`. The critical section never waits
/// on a consumer: `try_send` either succeeds immediately or the consumer is
/// dropped.
pub struct Fanout {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<Bytes>>>,
    next_id: AtomicU64,
    evicted_total: AtomicU64,
    config: FanoutConfig,
}

impl Fanout {
    /// Create a registry with default configuration
    pub fn new() -> Self {
        Self::with_config(FanoutConfig::default())
    }

    pub fn with_config(config: FanoutConfig) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            evicted_total: AtomicU64::new(0),
            config,
        }
    }

    pub fn config(&self) -> &FanoutConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SubscriberId, mpsc::Sender<Bytes>>> {
        // A panic while holding the lock cannot leave the map half-updated
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a new consumer queue
    ///
    /// The returned subscription unregisters itself when dropped.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.config.queue_capacity);

        let count = {
            let mut subscribers = self.lock();
            subscribers.insert(id, tx);
            subscribers.len()
        };

        tracing::debug!(subscriber = id, subscribers = count, "Subscriber added");

        Subscription::new(id, rx, Arc::clone(self))
    }

    /// Remove a consumer queue
    ///
    /// Idempotent: returns false if the id was already removed (including by
    /// eviction).
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.lock();
        let removed = subscribers.remove(&id).is_some();

        if removed {
            tracing::debug!(
                subscriber = id,
                subscribers = subscribers.len(),
                "Subscriber removed"
            );
        }

        removed
    }

    /// Offer a chunk to every registered queue without blocking
    ///
    /// Full queues are evicted: the consumer is considered lost, not behind.
    pub fn publish(&self, data: Bytes) -> PublishOutcome {
        let mut outcome = PublishOutcome::default();
        let mut subscribers = self.lock();

        subscribers.retain(|id, tx| match tx.try_send(data.clone()) {
            Ok(()) => {
                outcome.delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    subscriber = *id,
                    capacity = self.config.queue_capacity,
                    "Subscriber queue full, evicting"
                );
                outcome.evicted += 1;
                false
            }
            Err(TrySendError::Closed(_)) => {
                outcome.evicted += 1;
                false
            }
        });

        if outcome.evicted > 0 {
            self.evicted_total
                .fetch_add(outcome.evicted as u64, Ordering::Relaxed);
        }

        outcome
    }

    /// Number of registered queues
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    pub fn is_subscribed(&self, id: SubscriberId) -> bool {
        self.lock().contains_key(&id)
    }

    /// Consumers evicted since startup
    pub fn evicted_total(&self) -> u64 {
        self.evicted_total.load(Ordering::Relaxed)
    }
}

impl Default for Fanout {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribe_unsubscribe() {
        let fanout = Arc::new(Fanout::new());

        let sub = fanout.subscribe();
        assert_eq!(fanout.subscriber_count(), 1);
        assert!(fanout.is_subscribed(sub.id()));

        assert!(fanout.unsubscribe(sub.id()));
        assert_eq!(fanout.subscriber_count(), 0);

        // Second removal is a no-op
        assert!(!fanout.unsubscribe(sub.id()));
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let fanout = Arc::new(Fanout::new());

        let sub = fanout.subscribe();
        let _other = fanout.subscribe();
        assert_eq!(fanout.subscriber_count(), 2);

        drop(sub);
        assert_eq!(fanout.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_publish_to_two_subscribers() {
        let fanout = Arc::new(Fanout::new());
        let mut a = fanout.subscribe();
        let mut b = fanout.subscribe();

        let outcome = fanout.publish(Bytes::from_static(b"AAAAA"));
        assert_eq!(outcome.delivered, 2);
        assert_eq!(outcome.evicted, 0);

        assert_eq!(a.try_recv(), Some(Bytes::from_static(b"AAAAA")));
        assert_eq!(b.try_recv(), Some(Bytes::from_static(b"AAAAA")));
    }

    #[tokio::test]
    async fn test_per_subscriber_fifo() {
        let fanout = Arc::new(Fanout::new());
        let mut sub = fanout.subscribe();

        for i in 0..10u8 {
            fanout.publish(Bytes::from(vec![i]));
        }

        for i in 0..10u8 {
            assert_eq!(sub.recv().await, Some(Bytes::from(vec![i])));
        }
    }

    #[tokio::test]
    async fn test_slow_subscriber_evicted() {
        let fanout = Arc::new(Fanout::new());
        let mut slow = fanout.subscribe();
        let mut healthy = fanout.subscribe();

        for _ in 0..300 {
            fanout.publish(Bytes::from_static(b"x"));
            healthy.try_recv().unwrap();
        }
        assert_eq!(fanout.subscriber_count(), 2);

        // 301st chunk overflows the slow queue
        let outcome = fanout.publish(Bytes::from_static(b"x"));
        assert_eq!(outcome.evicted, 1);
        assert_eq!(outcome.delivered, 1);
        assert!(!fanout.is_subscribed(slow.id()));
        assert!(fanout.is_subscribed(healthy.id()));
        assert_eq!(fanout.evicted_total(), 1);

        // Publishing after eviction keeps working
        let outcome = fanout.publish(Bytes::from_static(b"y"));
        assert_eq!(outcome, PublishOutcome { delivered: 1, evicted: 0 });

        // The evicted consumer drains what it had, then sees the end
        let mut drained = 0;
        while slow.recv().await.is_some() {
            drained += 1;
        }
        assert_eq!(drained, 300);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let fanout = Fanout::new();
        assert_eq!(
            fanout.publish(Bytes::from_static(b"x")),
            PublishOutcome::default()
        );
    }

    #[tokio::test]
    async fn test_custom_capacity() {
        let fanout = Arc::new(Fanout::with_config(
            FanoutConfig::default().queue_capacity(2),
        ));
        let _sub = fanout.subscribe();

        fanout.publish(Bytes::from_static(b"1"));
        fanout.publish(Bytes::from_static(b"2"));
        assert_eq!(fanout.subscriber_count(), 1);

        fanout.publish(Bytes::from_static(b"3"));
        assert_eq!(fanout.subscriber_count(), 0);
    }
}
