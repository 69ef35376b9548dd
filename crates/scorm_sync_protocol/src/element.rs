//! Data model elements and batches.

use serde::{Deserialize, Serialize};

/// Identifier of a batch.
///
/// Ids are minted by a single counter per engine, seeded from wall-clock
/// milliseconds, so they are unique within a run and unlikely to collide
/// across runs.
pub type BatchId = u64;

/// A single timestamped change to the data model.
///
/// Elements are immutable once created. `time` is wall-clock seconds since
/// the Unix epoch with sub-second precision; `sequence` is unique and
/// increasing within one process run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    /// Data model key, e.g. `cmi.score.raw`.
    pub key: String,
    /// New value for the key.
    pub value: String,
    /// Seconds since the Unix epoch when the change was made.
    pub time: f64,
    /// Per-run creation counter.
    #[serde(default, alias = "counter")]
    pub sequence: u64,
}

impl Element {
    /// Creates a new element.
    pub fn new(key: impl Into<String>, value: impl Into<String>, time: f64, sequence: u64) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            time,
            sequence,
        }
    }

    /// Returns the element timestamp in seconds.
    pub fn timestamp(&self) -> f64 {
        self.time
    }
}

/// An ordered group of elements sent and acknowledged together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// Batch identifier.
    pub id: BatchId,
    /// Elements in insertion order.
    pub elements: Vec<Element>,
}

impl Batch {
    /// Creates a new batch.
    pub fn new(id: BatchId, elements: Vec<Element>) -> Self {
        Self { id, elements }
    }

    /// Returns the number of elements in the batch.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if the batch carries no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
