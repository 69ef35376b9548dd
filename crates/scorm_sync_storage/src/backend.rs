//! Durable store trait definition.

use crate::error::StorageResult;

/// A best-effort key/value blob store that survives process restart.
///
/// # Invariants
///
/// - `put` replaces the previous value for the key in full
/// - after `put` returns `Ok`, `get` returns exactly the bytes written, also
///   after the process restarts (for persistent backends)
/// - `get` of a key never written returns `Ok(None)`
/// - `remove` of an absent key is not an error
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing
/// - [`super::FileStore`] - For persistent storage
/// - [`super::UnavailableStore`] - For running without durability
pub trait DurableStore: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the read fails.
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Replaces the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the write fails. On
    /// error the previous value is left in place.
    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Removes the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the removal fails.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Lists the keys currently stored, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or cannot be listed.
    fn keys(&self) -> StorageResult<Vec<String>>;

    /// Returns false if the store is known to reject every operation.
    fn is_available(&self) -> bool {
        true
    }
}
