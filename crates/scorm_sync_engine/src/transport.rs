//! Transport layer abstraction for delivering batches.
//!
//! Two roles exist. The primary transport is a persistent bidirectional
//! channel: sends are fire-and-forget and everything the server says comes
//! back as [`TransportEvent`]s on a channel consumed by the scheduler. The
//! fallback transport is request/response: one call carries every pending
//! batch and returns the ids the server stored.

use crate::error::{SyncError, SyncResult};
use parking_lot::Mutex;
use scorm_sync_protocol::{
    Batch, BatchId, FallbackRequest, FallbackResponse, ProtocolResult, ServerMessage, WireMessage,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Something the primary channel reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    /// The channel is open.
    Connected,
    /// The channel closed or failed.
    Disconnected,
    /// The server stored the batch with this id.
    Acknowledged(BatchId),
    /// The server declared the attempt complete.
    RemoteCompletion,
}

impl TransportEvent {
    /// Converts a decoded server message into events.
    ///
    /// A receipt comes before a completion notice carried in the same frame.
    pub fn from_server_message(message: &ServerMessage) -> Vec<TransportEvent> {
        let mut events = Vec::with_capacity(2);
        if let Some(id) = message.received {
            events.push(TransportEvent::Acknowledged(id));
        }
        if message.is_completion() {
            events.push(TransportEvent::RemoteCompletion);
        }
        events
    }

    /// Decodes a raw frame received on the primary channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a valid server message.
    pub fn from_frame(frame: &[u8]) -> ProtocolResult<Vec<TransportEvent>> {
        let message = ServerMessage::decode(frame)?;
        Ok(Self::from_server_message(&message))
    }
}

/// Sending half of the transport event feed.
pub type EventSender = UnboundedSender<TransportEvent>;

/// Receiving half of the transport event feed.
pub type EventReceiver = UnboundedReceiver<TransportEvent>;

/// Creates the event feed a primary transport reports into.
pub fn transport_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// The persistent, low-latency channel.
///
/// Implementations report connectivity changes and server messages through
/// an [`EventSender`] handed to them at construction.
pub trait PrimaryTransport: Send + Sync {
    /// Returns true if the channel is open.
    fn is_open(&self) -> bool;

    /// Queues a batch for transmission.
    ///
    /// Returns true if the batch was accepted for transmission; this says
    /// nothing about delivery.
    fn send(&self, batch: &Batch) -> bool;

    /// Closes the channel.
    fn close(&self);
}

/// The request/response channel.
pub trait FallbackTransport: Send + Sync {
    /// Sends every batch in `request` in a single call.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure or a non-success response.
    fn send(&self, request: &FallbackRequest) -> SyncResult<FallbackResponse>;
}

/// A primary transport that never connects.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflinePrimary;

impl PrimaryTransport for OfflinePrimary {
    fn is_open(&self) -> bool {
        false
    }

    fn send(&self, _batch: &Batch) -> bool {
        false
    }

    fn close(&self) {}
}

#[derive(Debug)]
struct MockPrimaryInner {
    open: AtomicBool,
    sent: Mutex<Vec<Batch>>,
    events: Mutex<Option<EventSender>>,
}

/// A mock primary transport for testing.
///
/// Clones share state, so a test can keep one handle while the engine owns
/// another.
#[derive(Debug, Clone)]
pub struct MockPrimary {
    inner: Arc<MockPrimaryInner>,
}

impl MockPrimary {
    /// Creates a closed mock transport.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MockPrimaryInner {
                open: AtomicBool::new(false),
                sent: Mutex::new(Vec::new()),
                events: Mutex::new(None),
            }),
        }
    }

    /// Creates a closed mock transport reporting into `events`.
    pub fn with_events(events: EventSender) -> Self {
        let mock = Self::new();
        *mock.inner.events.lock() = Some(events);
        mock
    }

    /// Sets the open state without reporting an event.
    pub fn set_open(&self, open: bool) {
        self.inner.open.store(open, Ordering::SeqCst);
    }

    /// Opens the channel and reports `Connected`.
    pub fn connect(&self) {
        self.set_open(true);
        self.emit(TransportEvent::Connected);
    }

    /// Closes the channel and reports `Disconnected`.
    pub fn disconnect(&self) {
        self.set_open(false);
        self.emit(TransportEvent::Disconnected);
    }

    /// Reports a server receipt for `id`.
    pub fn acknowledge(&self, id: BatchId) {
        self.emit(TransportEvent::Acknowledged(id));
    }

    /// Reports a remote completion notice.
    pub fn complete(&self) {
        self.emit(TransportEvent::RemoteCompletion);
    }

    /// Returns every batch sent so far.
    pub fn sent(&self) -> Vec<Batch> {
        self.inner.sent.lock().clone()
    }

    /// Returns the ids of every batch sent so far, in send order.
    pub fn sent_ids(&self) -> Vec<BatchId> {
        self.inner.sent.lock().iter().map(|b| b.id).collect()
    }

    /// Forgets the recorded sends.
    pub fn clear_sent(&self) {
        self.inner.sent.lock().clear();
    }

    fn emit(&self, event: TransportEvent) {
        if let Some(events) = self.inner.events.lock().as_ref() {
            let _ = events.send(event);
        }
    }
}

impl Default for MockPrimary {
    fn default() -> Self {
        Self::new()
    }
}

impl PrimaryTransport for MockPrimary {
    fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::SeqCst)
    }

    fn send(&self, batch: &Batch) -> bool {
        if !self.is_open() {
            return false;
        }
        self.inner.sent.lock().push(batch.clone());
        true
    }

    fn close(&self) {
        self.set_open(false);
    }
}

#[derive(Debug, Default)]
struct MockFallbackInner {
    failing: AtomicBool,
    requests: Mutex<Vec<FallbackRequest>>,
}

/// A mock fallback transport for testing.
///
/// While healthy it acknowledges every batch it receives; while failing it
/// returns a retryable transport error. Every request is recorded either way.
#[derive(Debug, Clone, Default)]
pub struct MockFallback {
    inner: Arc<MockFallbackInner>,
}

impl MockFallback {
    /// Creates a healthy mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent calls fail or succeed.
    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns every request received so far.
    pub fn requests(&self) -> Vec<FallbackRequest> {
        self.inner.requests.lock().clone()
    }

    /// Returns the most recent request.
    pub fn last_request(&self) -> Option<FallbackRequest> {
        self.inner.requests.lock().last().cloned()
    }
}

impl FallbackTransport for MockFallback {
    fn send(&self, request: &FallbackRequest) -> SyncResult<FallbackResponse> {
        self.inner.requests.lock().push(request.clone());
        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(SyncError::transport_retryable("simulated network error"));
        }
        Ok(FallbackResponse::new(request.batch_ids()))
    }
}
