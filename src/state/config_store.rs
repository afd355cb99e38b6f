//! Last-seen configuration blob
//!
//! A consumer joining mid-stream cannot decode anything until it has seen
//! the parameter sets (SPS/PPS for H.264), which the producer typically
//! sends once per connection. The store keeps the latest one for replay.

use std::sync::RwLock;

use bytes::Bytes;

/// Holds the most recent configuration blob
#[derive(Debug, Default)]
pub struct ConfigStore {
    blob: RwLock<Option<Bytes>>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored blob
    pub fn set(&self, blob: Bytes) {
        let mut slot = self.blob.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(blob);
    }

    /// Current blob, if one has been received
    ///
    /// Cloning `Bytes` only bumps a reference count.
    pub fn get(&self) -> Option<Bytes> {
        self.blob.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_set(&self) -> bool {
        self.blob.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_until_set() {
        let store = ConfigStore::new();
        assert!(store.get().is_none());
        assert!(!store.is_set());
    }

    #[test]
    fn test_set_replaces() {
        let store = ConfigStore::new();

        store.set(Bytes::from_static(b"first"));
        store.set(Bytes::from_static(b"second"));

        assert_eq!(store.get(), Some(Bytes::from_static(b"second")));
    }

    #[test]
    fn test_visible_across_threads() {
        let store = std::sync::Arc::new(ConfigStore::new());
        let writer = std::sync::Arc::clone(&store);

        std::thread::spawn(move || writer.set(Bytes::from_static(b"sps")))
            .join()
            .unwrap();

        assert_eq!(store.get(), Some(Bytes::from_static(b"sps")));
    }
}
