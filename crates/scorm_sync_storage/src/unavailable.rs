//! A store that is never available.

use crate::backend::DurableStore;
use crate::error::{StorageError, StorageResult};

/// A durable store that rejects every operation.
///
/// Running the engine on this store means it operates purely in memory:
/// batches are still retransmitted, but nothing survives a process crash.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStore;

impl UnavailableStore {
    /// Creates the store.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DurableStore for UnavailableStore {
    fn get(&self, _key: &str) -> StorageResult<Option<Vec<u8>>> {
        Err(StorageError::unavailable("no durable storage configured"))
    }

    fn put(&self, _key: &str, _value: &[u8]) -> StorageResult<()> {
        Err(StorageError::unavailable("no durable storage configured"))
    }

    fn remove(&self, _key: &str) -> StorageResult<()> {
        Err(StorageError::unavailable("no durable storage configured"))
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Err(StorageError::unavailable("no durable storage configured"))
    }

    fn is_available(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_rejects() {
        let store = UnavailableStore::new();
        assert!(!store.is_available());
        assert!(store.get("k").is_err());
        assert!(store.put("k", b"v").is_err());
        assert!(store.remove("k").is_err());
        assert!(store.keys().is_err());
    }
}
