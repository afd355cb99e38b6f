//! Fan-out configuration

use std::time::Duration;

/// Default per-consumer queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 300;

/// Configuration for the fan-out registry
#[derive(Debug, Clone)]
pub struct FanoutConfig {
    /// Chunks buffered per consumer before it is evicted
    pub queue_capacity: usize,

    /// How long a responder waits on an empty queue before rechecking liveness
    pub idle_wait: Duration,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            idle_wait: Duration::from_secs(5),
        }
    }
}

impl FanoutConfig {
    /// Set the per-consumer queue capacity (at least 1)
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn idle_wait(mut self, wait: Duration) -> Self {
        self.idle_wait = wait;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FanoutConfig::default();
        assert_eq!(config.queue_capacity, 300);
        assert_eq!(config.idle_wait, Duration::from_secs(5));
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let config = FanoutConfig::default().queue_capacity(0);
        assert_eq!(config.queue_capacity, 1);
    }
}
