//! Protocol messages for the primary channel, the fallback endpoint and the
//! durable snapshot.

use crate::element::{Batch, BatchId, Element};
use crate::error::{ProtocolError, ProtocolResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Completion status value that forces remote termination.
pub const COMPLETION_COMPLETED: &str = "completed";

/// JSON encoding shared by every message type.
pub trait WireMessage: Serialize + DeserializeOwned {
    /// Encodes to JSON bytes.
    fn encode(&self) -> ProtocolResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Decodes from JSON bytes.
    fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))
    }
}

/// A batch sent over the primary channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchMessage {
    /// Batch identifier.
    pub batch_id: BatchId,
    /// Elements in insertion order.
    pub elements: Vec<Element>,
}

impl BatchMessage {
    /// Creates a message carrying the given batch.
    pub fn from_batch(batch: &Batch) -> Self {
        Self {
            batch_id: batch.id,
            elements: batch.elements.clone(),
        }
    }

    /// Converts the message back into a batch.
    pub fn into_batch(self) -> Batch {
        Batch::new(self.batch_id, self.elements)
    }
}

impl WireMessage for BatchMessage {}

/// A message from the server on the primary channel.
///
/// Either field may be present; a server may confirm a batch and announce
/// completion in the same frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerMessage {
    /// Confirmation that the batch with this id was stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received: Option<BatchId>,
    /// Out-of-band completion notice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_status: Option<String>,
}

impl ServerMessage {
    /// Creates a receipt for a batch.
    pub fn received(batch_id: BatchId) -> Self {
        Self {
            received: Some(batch_id),
            completion_status: None,
        }
    }

    /// Creates a completion notice.
    pub fn completed() -> Self {
        Self {
            received: None,
            completion_status: Some(COMPLETION_COMPLETED.to_string()),
        }
    }

    /// Returns true if this message announces that the attempt is complete.
    pub fn is_completion(&self) -> bool {
        self.completion_status.as_deref() == Some(COMPLETION_COMPLETED)
    }
}

impl WireMessage for ServerMessage {}

/// Body of a fallback request: every pending batch keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FallbackRequest {
    /// Pending batches.
    pub batches: BTreeMap<BatchId, Vec<Element>>,
}

impl FallbackRequest {
    /// Builds a request from a set of batches. Empty batches are skipped.
    pub fn from_batches<'a>(batches: impl IntoIterator<Item = &'a Batch>) -> Self {
        let batches = batches
            .into_iter()
            .filter(|b| !b.is_empty())
            .map(|b| (b.id, b.elements.clone()))
            .collect();
        Self { batches }
    }

    /// Returns true if there is nothing to send.
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Returns the number of batches in the request.
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// Returns the batch ids in ascending order.
    pub fn batch_ids(&self) -> Vec<BatchId> {
        self.batches.keys().copied().collect()
    }

    /// Iterates over the contained batches.
    pub fn iter_batches(&self) -> impl Iterator<Item = Batch> + '_ {
        self.batches
            .iter()
            .map(|(id, elements)| Batch::new(*id, elements.clone()))
    }
}

impl WireMessage for FallbackRequest {}

/// Response from the fallback endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FallbackResponse {
    /// Ids of the batches the server has stored.
    #[serde(default)]
    pub received_batches: Vec<BatchId>,
}

impl FallbackResponse {
    /// Creates a response acknowledging the given ids.
    pub fn new(received_batches: Vec<BatchId>) -> Self {
        Self { received_batches }
    }
}

impl WireMessage for FallbackResponse {}

/// Layout of the durable local snapshot.
///
/// Holds every batch that has been minted but not yet acknowledged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutboxSnapshot {
    /// Unacknowledged batches keyed by id.
    #[serde(default)]
    pub sent: BTreeMap<BatchId, Vec<Element>>,
}

impl OutboxSnapshot {
    /// Builds a snapshot from the tracked batches.
    pub fn from_batches<'a>(batches: impl IntoIterator<Item = &'a Batch>) -> Self {
        let sent = batches
            .into_iter()
            .map(|b| (b.id, b.elements.clone()))
            .collect();
        Self { sent }
    }

    /// Returns the recovered batches ordered by id.
    pub fn into_batches(self) -> Vec<Batch> {
        self.sent
            .into_iter()
            .map(|(id, elements)| Batch::new(id, elements))
            .collect()
    }

    /// Returns true if the snapshot holds no batches.
    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }

    /// Returns the total number of elements across all batches.
    pub fn element_count(&self) -> usize {
        self.sent.values().map(Vec::len).sum()
    }
}

impl WireMessage for OutboxSnapshot {}
