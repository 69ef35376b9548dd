//! Change queue and batch tracker.
//!
//! Every element lives in exactly one place from creation until its batch
//! is acknowledged: either the change queue, or one tracked batch. `flush`
//! is the only operation that moves elements between the two, and it moves
//! the whole queue at once.

use scorm_sync_protocol::{Batch, BatchId, Element, OutboxSnapshot};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct TrackedBatch {
    batch: Batch,
    /// Sent over the current primary connection.
    sent_on_primary: bool,
}

/// Unbatched changes plus every batch awaiting acknowledgment.
#[derive(Debug, Clone)]
pub struct Outbox {
    queue: Vec<Element>,
    tracker: BTreeMap<BatchId, TrackedBatch>,
    next_id: BatchId,
}

impl Outbox {
    /// Creates an outbox holding recovered batches.
    ///
    /// The first minted id is `seed`, or one past the greatest recovered id
    /// if that is larger, so a recovered id is never issued again.
    pub fn new(seed: BatchId, recovered: Vec<Batch>) -> Self {
        let next_id = recovered
            .iter()
            .map(|b| b.id.saturating_add(1))
            .fold(seed, BatchId::max);
        let tracker = recovered
            .into_iter()
            .map(|batch| {
                (
                    batch.id,
                    TrackedBatch {
                        batch,
                        sent_on_primary: false,
                    },
                )
            })
            .collect();
        Self {
            queue: Vec::new(),
            tracker,
            next_id,
        }
    }

    /// Appends an element to the change queue.
    pub fn enqueue(&mut self, element: Element) {
        self.queue.push(element);
    }

    /// Moves the whole change queue into a new tracked batch.
    ///
    /// Returns the new batch id, or `None` if the queue was empty.
    pub fn flush(&mut self) -> Option<BatchId> {
        if self.queue.is_empty() {
            return None;
        }
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        let elements = std::mem::take(&mut self.queue);
        self.tracker.insert(
            id,
            TrackedBatch {
                batch: Batch::new(id, elements),
                sent_on_primary: false,
            },
        );
        Some(id)
    }

    /// Removes an acknowledged batch.
    ///
    /// Returns false if no batch with that id is tracked.
    pub fn acknowledge(&mut self, id: BatchId) -> bool {
        self.tracker.remove(&id).is_some()
    }

    /// Returns every unacknowledged batch in id order.
    pub fn pending_batches(&self) -> Vec<Batch> {
        self.tracker.values().map(|t| t.batch.clone()).collect()
    }

    /// Returns the batches not yet sent over the current primary connection.
    pub fn unsent_on_primary(&self) -> Vec<Batch> {
        self.tracker
            .values()
            .filter(|t| !t.sent_on_primary)
            .map(|t| t.batch.clone())
            .collect()
    }

    /// Records that a batch went out over the primary connection.
    pub fn mark_sent_on_primary(&mut self, id: BatchId) {
        if let Some(tracked) = self.tracker.get_mut(&id) {
            tracked.sent_on_primary = true;
        }
    }

    /// Forgets which batches went out over the primary connection.
    pub fn reset_primary_marks(&mut self) {
        for tracked in self.tracker.values_mut() {
            tracked.sent_on_primary = false;
        }
    }

    /// Returns true if the batch is tracked.
    pub fn is_pending(&self, id: BatchId) -> bool {
        self.tracker.contains_key(&id)
    }

    /// Returns the ids of the tracked batches in order.
    pub fn pending_ids(&self) -> Vec<BatchId> {
        self.tracker.keys().copied().collect()
    }

    /// Returns the number of tracked batches.
    pub fn pending_len(&self) -> usize {
        self.tracker.len()
    }

    /// Returns the number of queued elements.
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// Returns the queued elements.
    pub fn queued(&self) -> &[Element] {
        &self.queue
    }

    /// Returns true if nothing is queued or awaiting acknowledgment.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.tracker.is_empty()
    }

    /// Returns the id the next flush will mint.
    pub fn next_id(&self) -> BatchId {
        self.next_id
    }

    /// Captures the tracked batches in durable form.
    pub fn snapshot(&self) -> OutboxSnapshot {
        OutboxSnapshot::from_batches(self.tracker.values().map(|t| &t.batch))
    }
}
