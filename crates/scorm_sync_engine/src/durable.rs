//! Durable local store adapter for the outbox.

use scorm_sync_protocol::{Batch, OutboxSnapshot, WireMessage};
use scorm_sync_storage::DurableStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Persists the batch tracker under one per-session key.
///
/// Durability is best-effort: failures are recorded, never propagated, and
/// the in-memory tracker stays authoritative.
pub struct DurableOutbox {
    store: Arc<dyn DurableStore>,
    key: String,
    last_write: Option<bool>,
}

impl DurableOutbox {
    /// Creates an adapter writing to `key` in `store`.
    pub fn new(store: Arc<dyn DurableStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            last_write: None,
        }
    }

    /// Returns the key the snapshot is stored under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Reads back the batches left by a previous run.
    ///
    /// An unavailable store, a missing key or content that fails to parse
    /// all yield no batches. Batches without elements are dropped, and the
    /// cleaned snapshot is written back.
    pub fn recover(&mut self) -> Vec<Batch> {
        let bytes = match self.store.get(&self.key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(key = %self.key, error = %e, "durable store unreadable, starting cold");
                return Vec::new();
            }
        };

        match OutboxSnapshot::decode(&bytes) {
            Ok(snapshot) => {
                let (batches, empty): (Vec<Batch>, Vec<Batch>) = snapshot
                    .into_batches()
                    .into_iter()
                    .partition(|b| !b.is_empty());
                if !empty.is_empty() {
                    warn!(key = %self.key, dropped = empty.len(), "dropping empty recovered batches");
                    self.persist(&OutboxSnapshot::from_batches(&batches));
                }
                debug!(key = %self.key, batches = batches.len(), "recovered outbox");
                batches
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "discarding malformed durable snapshot");
                Vec::new()
            }
        }
    }

    /// Replaces the stored snapshot.
    ///
    /// Returns whether the write succeeded.
    pub fn persist(&mut self, snapshot: &OutboxSnapshot) -> bool {
        let result = snapshot
            .encode()
            .map_err(|e| e.to_string())
            .and_then(|bytes| {
                self.store
                    .put(&self.key, &bytes)
                    .map_err(|e| e.to_string())
            });

        let ok = match result {
            Ok(()) => true,
            Err(e) => {
                if self.last_write != Some(false) {
                    warn!(key = %self.key, error = %e, "durable write failed");
                }
                false
            }
        };
        self.last_write = Some(ok);
        ok
    }

    /// Returns true if the most recent write succeeded.
    ///
    /// False before anything has been written.
    pub fn is_durable(&self) -> bool {
        self.last_write == Some(true)
    }

    /// Returns the outcome of the most recent write, if any.
    pub fn last_write(&self) -> Option<bool> {
        self.last_write
    }
}

impl std::fmt::Debug for DurableOutbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableOutbox")
            .field("key", &self.key)
            .field("last_write", &self.last_write)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scorm_sync_protocol::Element;
    use scorm_sync_storage::{FileStore, InMemoryStore, UnavailableStore};
    use tempfile::tempdir;

    const KEY: &str = "attempt-1-scorm-data";

    fn batch(id: u64) -> Batch {
        Batch::new(id, vec![Element::new("cmi.location", "p3", 10.0, 0)])
    }

    #[test]
    fn recover_missing_is_empty() {
        let mut durable = DurableOutbox::new(Arc::new(InMemoryStore::new()), KEY);
        assert!(durable.recover().is_empty());
        assert!(!durable.is_durable());
        assert_eq!(durable.last_write(), None);
    }

    #[test]
    fn persist_then_recover() {
        let store = Arc::new(InMemoryStore::new());
        let mut durable = DurableOutbox::new(store.clone(), KEY);

        let batches = [batch(4), batch(2)];
        assert!(durable.persist(&OutboxSnapshot::from_batches(&batches)));
        assert!(durable.is_durable());

        let mut reopened = DurableOutbox::new(store, KEY);
        let ids: Vec<u64> = reopened.recover().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![2, 4]);
    }

    #[test]
    fn malformed_content_is_cold_start() {
        let store = InMemoryStore::with_entry(KEY, &b"{not json"[..]);
        let mut durable = DurableOutbox::new(Arc::new(store), KEY);
        assert!(durable.recover().is_empty());
    }

    #[test]
    fn legacy_counter_field_recovers() {
        let body = br#"{"sent":{"9":[{"key":"cmi.location","value":"p1","time":3.5,"counter":4}]}}"#;
        let store = InMemoryStore::with_entry(KEY, &body[..]);
        let mut durable = DurableOutbox::new(Arc::new(store), KEY);

        let batches = durable.recover();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].id, 9);
        assert_eq!(batches[0].elements[0].sequence, 4);
    }

    #[test]
    fn unavailable_store_degrades() {
        let mut durable = DurableOutbox::new(Arc::new(UnavailableStore::new()), KEY);
        assert!(durable.recover().is_empty());
        assert!(!durable.persist(&OutboxSnapshot::from_batches(&[batch(1)])));
        assert!(!durable.is_durable());
        assert_eq!(durable.last_write(), Some(false));
    }

    #[test]
    fn durability_flag_follows_last_write() {
        let store = Arc::new(InMemoryStore::new());
        let mut durable = DurableOutbox::new(store.clone(), KEY);
        let snapshot = OutboxSnapshot::from_batches(&[batch(1)]);

        store.set_available(false);
        assert!(!durable.persist(&snapshot));
        assert!(!durable.is_durable());

        store.set_available(true);
        assert!(durable.persist(&snapshot));
        assert!(durable.is_durable());
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = Arc::new(FileStore::open(dir.path()).unwrap());
            let mut durable = DurableOutbox::new(store, KEY);
            durable.persist(&OutboxSnapshot::from_batches(&[batch(11)]));
        }
        let store = Arc::new(FileStore::open(dir.path()).unwrap());
        let mut durable = DurableOutbox::new(store, KEY);
        assert_eq!(durable.recover(), vec![batch(11)]);
    }

    #[test]
    fn empty_batches_dropped_on_recovery() {
        let body = br#"{"sent":{"5":[],"6":[{"key":"cmi.location","value":"p1","time":3.5,"sequence":0}]}}"#;
        let store = Arc::new(InMemoryStore::with_entry(KEY, &body[..]));
        let mut durable = DurableOutbox::new(store.clone(), KEY);

        let ids: Vec<u64> = durable.recover().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![6]);
        assert!(durable.is_durable());

        let stored = OutboxSnapshot::decode(&store.get(KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored.sent.keys().copied().collect::<Vec<_>>(), vec![6]);
    }
}
