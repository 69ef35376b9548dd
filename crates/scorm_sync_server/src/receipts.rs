//! Per-session receipt log and current values.

use parking_lot::RwLock;
use scorm_sync_protocol::{Batch, BatchId, Element};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// The value the server holds for one key.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredValue {
    /// Current value.
    pub value: String,
    /// Timestamp of the element that wrote it.
    pub time: f64,
    /// Batch that carried the element.
    pub batch_id: BatchId,
    /// Sequence number of the element.
    pub sequence: u64,
}

impl StoredValue {
    fn from_element(batch_id: BatchId, element: &Element) -> Self {
        Self {
            value: element.value.clone(),
            time: element.time,
            batch_id,
            sequence: element.sequence,
        }
    }

    /// Orders writes by timestamp, then batch id, then sequence.
    fn precedence(&self, other: &StoredValue) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then(self.batch_id.cmp(&other.batch_id))
            .then(self.sequence.cmp(&other.sequence))
    }
}

#[derive(Debug, Default)]
struct SessionRecord {
    received: BTreeSet<BatchId>,
    values: BTreeMap<String, StoredValue>,
    completed: bool,
}

/// Server-side record of every session.
///
/// The log maintains:
/// - The set of batch ids stored per session
/// - The latest value of every key per session
/// - Whether each session has been marked complete
#[derive(Debug, Default)]
pub struct ReceiptLog {
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl ReceiptLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a batch for a session.
    ///
    /// Returns false if the id was already stored; the batch is then not
    /// applied again. Each element replaces the stored value of its key
    /// only if it is newer.
    pub fn apply(&self, session: &str, batch: &Batch) -> bool {
        let mut sessions = self.sessions.write();
        let record = sessions.entry(session.to_string()).or_default();
        if !record.received.insert(batch.id) {
            return false;
        }
        for element in &batch.elements {
            let incoming = StoredValue::from_element(batch.id, element);
            match record.values.get_mut(&element.key) {
                Some(current) if incoming.precedence(current) != Ordering::Greater => {}
                Some(current) => *current = incoming,
                None => {
                    record.values.insert(element.key.clone(), incoming);
                }
            }
        }
        true
    }

    /// Returns true if the batch id has been stored for the session.
    pub fn is_received(&self, session: &str, id: BatchId) -> bool {
        self.sessions
            .read()
            .get(session)
            .is_some_and(|r| r.received.contains(&id))
    }

    /// Returns every stored batch id for the session, ascending.
    pub fn received_ids(&self, session: &str) -> Vec<BatchId> {
        self.sessions
            .read()
            .get(session)
            .map(|r| r.received.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Returns the stored value of a key.
    pub fn value(&self, session: &str, key: &str) -> Option<StoredValue> {
        self.sessions
            .read()
            .get(session)
            .and_then(|r| r.values.get(key).cloned())
    }

    /// Returns every key and value stored for the session.
    pub fn values(&self, session: &str) -> BTreeMap<String, String> {
        self.sessions
            .read()
            .get(session)
            .map(|r| {
                r.values
                    .iter()
                    .map(|(k, v)| (k.clone(), v.value.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Marks the session complete. Returns false if it already was.
    pub fn mark_complete(&self, session: &str) -> bool {
        let mut sessions = self.sessions.write();
        let record = sessions.entry(session.to_string()).or_default();
        !std::mem::replace(&mut record.completed, true)
    }

    /// Returns true if the session has been marked complete.
    pub fn is_complete(&self, session: &str) -> bool {
        self.sessions
            .read()
            .get(session)
            .is_some_and(|r| r.completed)
    }

    /// Returns the number of sessions seen.
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}
