//! In-memory durable store for testing.

use crate::backend::DurableStore;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// An in-memory durable store.
///
/// Values live as long as the store itself, so sharing one store (behind an
/// `Arc`) between two engine instances simulates a process restart.
///
/// The store can be switched off with [`InMemoryStore::set_available`] to
/// simulate a disabled or full browser-style storage area.
///
/// # Example
///
/// ```rust
/// use scorm_sync_storage::{DurableStore, InMemoryStore};
///
/// let store = InMemoryStore::new();
/// store.set_available(false);
/// assert!(store.put("k", b"v").is_err());
/// store.set_available(true);
/// assert!(store.put("k", b"v").is_ok());
/// ```
#[derive(Debug)]
pub struct InMemoryStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
    available: AtomicBool,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Creates a store with a pre-existing entry.
    ///
    /// Useful for testing recovery scenarios.
    #[must_use]
    pub fn with_entry(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        let store = Self::new();
        store.entries.write().insert(key.into(), value.into());
        store
    }

    /// Makes every subsequent operation succeed or fail.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Returns the number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn check_available(&self) -> StorageResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::unavailable("in-memory store switched off"))
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DurableStore for InMemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        self.check_available()?;
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        self.check_available()?;
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.check_available()?;
        self.entries.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        self.check_available()?;
        Ok(self.entries.read().keys().cloned().collect())
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}
