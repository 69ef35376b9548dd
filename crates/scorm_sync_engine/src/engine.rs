//! The sync engine: one object owning every piece of per-session state.
//!
//! All state transitions run to completion inside a single `&mut self`
//! call: a host read or write, a scheduler tick, or one transport event.
//! Nothing in here blocks on the network except [`Engine::run_fallback`],
//! which the scheduler never calls; it prepares the request under the lock
//! and sends it elsewhere.

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::datamodel::{DataModel, InitialData, WriteOutcome};
use crate::durable::DurableOutbox;
use crate::error::{SyncError, SyncResult};
use crate::health::{HealthInputs, HealthMonitor, HealthReport};
use crate::outbox::Outbox;
use crate::session::{Session, SessionState};
use crate::transport::{FallbackTransport, PrimaryTransport, TransportEvent};
use scorm_sync_protocol::{Batch, BatchId, Element, FallbackRequest, FallbackResponse};
use scorm_sync_storage::DurableStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Something the host should surface to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostNotice {
    /// The session has terminated.
    Terminated,
    /// The server ended the attempt remotely; interrupt the user before any
    /// reload so queued changes are not lost.
    RemoteCompletion,
}

/// Counters describing engine activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Elements recorded from accepted writes.
    pub elements_recorded: u64,
    /// Batches minted by flushes.
    pub batches_flushed: u64,
    /// Batches removed by acknowledgment.
    pub batches_acknowledged: u64,
    /// Sends over the primary channel.
    pub primary_sends: u64,
    /// Fallback calls attempted.
    pub fallback_attempts: u64,
    /// Fallback calls that failed.
    pub fallback_failures: u64,
    /// Durable writes that failed.
    pub durable_failures: u64,
}

/// Per-session sync engine.
pub struct Engine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    data: DataModel,
    outbox: Outbox,
    durable: DurableOutbox,
    primary: Box<dyn PrimaryTransport>,
    fallback: Arc<dyn FallbackTransport>,
    session: Session,
    health: HealthMonitor,
    next_sequence: u64,
    stats: EngineStats,
}

impl Engine {
    /// Creates an engine using the system clock.
    ///
    /// Anything the durable store holds for this session is recovered into
    /// the batch tracker and merged into the data model before this returns.
    pub fn new(
        config: EngineConfig,
        initial: InitialData,
        store: Arc<dyn DurableStore>,
        primary: Box<dyn PrimaryTransport>,
        fallback: Arc<dyn FallbackTransport>,
    ) -> Self {
        Self::with_clock(
            config,
            initial,
            store,
            primary,
            fallback,
            Arc::new(SystemClock),
        )
    }

    /// Creates an engine reading time from `clock`.
    pub fn with_clock(
        config: EngineConfig,
        initial: InitialData,
        store: Arc<dyn DurableStore>,
        primary: Box<dyn PrimaryTransport>,
        fallback: Arc<dyn FallbackTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut durable = DurableOutbox::new(store, config.storage_key());
        let recovered = durable.recover();
        let data = DataModel::from_sources(initial, &recovered);
        let outbox = Outbox::new(clock.now_millis(), recovered);

        info!(
            session = %config.session_id,
            recovered = outbox.pending_len(),
            mode = data.mode(),
            read_only = data.is_read_only(),
            "sync engine started"
        );

        let health = HealthMonitor::new(config.warning_linger);
        Self {
            config,
            clock,
            data,
            outbox,
            durable,
            primary,
            fallback,
            session: Session::new(),
            health,
            next_sequence: 0,
            stats: EngineStats::default(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the session state.
    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    /// Returns the data model.
    pub fn data(&self) -> &DataModel {
        &self.data
    }

    /// Returns the activity counters.
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Returns true if writes are refused because of mode or completion.
    pub fn is_read_only(&self) -> bool {
        self.data.is_read_only()
    }

    /// Starts the session.
    ///
    /// # Errors
    ///
    /// Fails unless the session is uninitialized.
    pub fn initialize(&mut self) -> SyncResult<()> {
        self.session.initialize()?;
        info!(session = %self.config.session_id, "session initialized");
        Ok(())
    }

    /// Ends the session.
    ///
    /// Flushes the change queue and refuses all later writes. The caller is
    /// expected to follow up with one immediate fallback attempt.
    ///
    /// # Errors
    ///
    /// Fails unless the session is initialized.
    pub fn terminate(&mut self) -> SyncResult<()> {
        self.session.terminate()?;
        self.finish();
        info!(
            session = %self.config.session_id,
            pending = self.outbox.pending_len(),
            "session terminated"
        );
        Ok(())
    }

    /// Ends the session from any state.
    ///
    /// Returns false if it had already ended.
    pub fn force_terminate(&mut self) -> bool {
        if !self.session.force_terminate() {
            return false;
        }
        self.finish();
        warn!(
            session = %self.config.session_id,
            pending = self.outbox.pending_len(),
            "session terminated remotely"
        );
        true
    }

    fn finish(&mut self) {
        self.data.seal();
        self.flush();
    }

    /// Reads a data model value, or the empty string.
    pub fn get_value(&self, key: &str) -> &str {
        self.data.read(key)
    }

    /// Writes a data model value.
    ///
    /// An accepted write is visible to `get_value` immediately and is
    /// queued for delivery. Writes after termination are rejected.
    pub fn set_value(&mut self, key: &str, value: &str) -> WriteOutcome {
        if self.session.state().is_terminated() {
            return WriteOutcome::Rejected;
        }
        let time = self.clock.now_secs();
        let outcome = self.data.write(key, value, time);
        if outcome.is_accepted() {
            let element = Element::new(key, value, time, self.next_sequence);
            self.next_sequence += 1;
            self.outbox.enqueue(element);
            self.stats.elements_recorded += 1;
        }
        outcome
    }

    /// Moves the change queue into a new batch and persists the tracker.
    ///
    /// Returns the new batch id, or `None` if nothing was queued.
    pub fn flush(&mut self) -> Option<BatchId> {
        let id = self.outbox.flush()?;
        self.stats.batches_flushed += 1;
        self.persist();
        debug!(batch_id = id, pending = self.outbox.pending_len(), "flushed batch");
        Some(id)
    }

    /// Removes an acknowledged batch and persists the tracker.
    ///
    /// Unknown ids are ignored. Returns true if a batch was removed.
    pub fn acknowledge(&mut self, id: BatchId) -> bool {
        self.acknowledge_all(std::iter::once(id)) > 0
    }

    fn acknowledge_all(&mut self, ids: impl IntoIterator<Item = BatchId>) -> usize {
        let mut removed = 0;
        for id in ids {
            if self.outbox.acknowledge(id) {
                debug!(batch_id = id, "batch acknowledged");
                removed += 1;
            }
        }
        if removed > 0 {
            self.stats.batches_acknowledged += removed as u64;
            self.persist();
        }
        removed
    }

    fn persist(&mut self) {
        let snapshot = self.outbox.snapshot();
        if !self.durable.persist(&snapshot) {
            self.stats.durable_failures += 1;
        }
    }

    /// Returns every unacknowledged batch in id order.
    pub fn pending_batches(&self) -> Vec<Batch> {
        self.outbox.pending_batches()
    }

    /// Returns the ids of every unacknowledged batch.
    pub fn pending_ids(&self) -> Vec<BatchId> {
        self.outbox.pending_ids()
    }

    /// Returns the number of elements waiting for the next flush.
    pub fn queued_len(&self) -> usize {
        self.outbox.queued_len()
    }

    /// Returns true if the primary channel is open and nothing is
    /// outstanding.
    pub fn is_primary_ready(&self) -> bool {
        self.primary.is_open() && self.outbox.pending_len() == 0
    }

    /// Runs one fast tick: flush, then send over the primary channel every
    /// batch not yet sent on the current connection.
    ///
    /// Sending is gated on the channel being open, not on
    /// [`Engine::is_primary_ready`]: readiness also requires an empty
    /// tracker and only feeds health. Each batch goes out once per
    /// connection; `Connected` clears the marks so everything pending is
    /// sent again.
    ///
    /// Returns the number of batches sent. Does nothing once terminated.
    pub fn on_fast_tick(&mut self) -> usize {
        if self.session.state().is_terminated() {
            return 0;
        }
        self.flush();
        self.send_unsent()
    }

    fn send_unsent(&mut self) -> usize {
        if !self.primary.is_open() {
            return 0;
        }
        let mut sent = 0;
        for batch in self.outbox.unsent_on_primary() {
            if !self.primary.send(&batch) {
                break;
            }
            self.outbox.mark_sent_on_primary(batch.id);
            sent += 1;
        }
        self.stats.primary_sends += sent as u64;
        sent
    }

    /// Applies one event from the primary channel.
    pub fn handle_event(&mut self, event: TransportEvent) -> Option<HostNotice> {
        match event {
            TransportEvent::Connected => {
                self.outbox.reset_primary_marks();
                let resent = self.send_unsent();
                self.flush();
                let fresh = self.send_unsent();
                info!(resent, fresh, "primary channel connected");
                None
            }
            TransportEvent::Disconnected => {
                self.outbox.reset_primary_marks();
                info!(pending = self.outbox.pending_len(), "primary channel closed");
                None
            }
            TransportEvent::Acknowledged(id) => {
                self.acknowledge(id);
                self.health.mark_recovered();
                None
            }
            TransportEvent::RemoteCompletion => self
                .force_terminate()
                .then_some(HostNotice::RemoteCompletion),
        }
    }

    /// Flushes and builds a fallback request carrying every pending batch.
    ///
    /// Returns `None` if there is nothing to send.
    pub fn prepare_fallback(&mut self) -> Option<FallbackRequest> {
        self.flush();
        let pending = self.outbox.pending_batches();
        let request = FallbackRequest::from_batches(&pending);
        if request.is_empty() {
            None
        } else {
            self.stats.fallback_attempts += 1;
            Some(request)
        }
    }

    /// Applies the outcome of a fallback call.
    ///
    /// On success every confirmed batch is removed. On failure nothing is
    /// removed and health is degraded until either transport succeeds.
    /// Returns the number of batches removed.
    pub fn complete_fallback(&mut self, result: SyncResult<FallbackResponse>) -> usize {
        match result {
            Ok(response) => {
                self.health.mark_recovered();
                let removed = self.acknowledge_all(response.received_batches);
                debug!(removed, pending = self.outbox.pending_len(), "fallback succeeded");
                removed
            }
            Err(e) => {
                self.fallback_failed(&e);
                0
            }
        }
    }

    fn fallback_failed(&mut self, e: &SyncError) {
        self.health.mark_degraded();
        self.stats.fallback_failures += 1;
        if e.is_retryable() {
            debug!(error = %e, pending = self.outbox.pending_len(), "fallback failed");
        } else {
            warn!(error = %e, pending = self.outbox.pending_len(), "fallback rejected");
        }
    }

    /// Returns the fallback transport, for sending a prepared request
    /// outside the engine lock.
    pub fn fallback_transport(&self) -> Arc<dyn FallbackTransport> {
        Arc::clone(&self.fallback)
    }

    /// Prepares, sends and applies one fallback call on the current thread.
    ///
    /// Returns the number of batches removed.
    ///
    /// # Errors
    ///
    /// Returns the transport error after recording it.
    pub fn run_fallback(&mut self) -> SyncResult<usize> {
        let Some(request) = self.prepare_fallback() else {
            return Ok(0);
        };
        match self.fallback.send(&request) {
            Ok(response) => Ok(self.complete_fallback(Ok(response))),
            Err(e) => {
                self.fallback_failed(&e);
                Err(e)
            }
        }
    }

    /// Evaluates health at `now`.
    pub fn health(&mut self, now: Instant) -> HealthReport {
        let inputs = HealthInputs {
            pending_batches: self.outbox.pending_len(),
            queued_elements: self.outbox.queued_len(),
            primary_ready: self.is_primary_ready(),
            durable: self.durable.is_durable(),
        };
        self.health.evaluate(now, inputs)
    }

    /// Closes the primary channel.
    pub fn close(&mut self) {
        self.primary.close();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("session", &self.config.session_id)
            .field("state", &self.session.state())
            .field("pending", &self.outbox.pending_ids())
            .field("queued", &self.outbox.queued_len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::datamodel::{MODE_KEY, MODE_NORMAL};
    use crate::session::LifecycleError;
    use crate::transport::{MockFallback, MockPrimary};
    use scorm_sync_storage::{InMemoryStore, UnavailableStore};

    struct Harness {
        engine: Engine,
        primary: MockPrimary,
        fallback: MockFallback,
        store: Arc<InMemoryStore>,
        clock: Arc<ManualClock>,
    }

    fn normal() -> InitialData {
        InitialData::new().with(MODE_KEY, MODE_NORMAL, 1.0)
    }

    fn harness_with(store: Arc<InMemoryStore>, initial: InitialData) -> Harness {
        let primary = MockPrimary::new();
        let fallback = MockFallback::new();
        let clock = Arc::new(ManualClock::new(1_000.0));
        let engine = Engine::with_clock(
            EngineConfig::new("1", "https://lms.example.com/fallback"),
            initial,
            store.clone(),
            Box::new(primary.clone()),
            Arc::new(fallback.clone()),
            clock.clone(),
        );
        Harness {
            engine,
            primary,
            fallback,
            store,
            clock,
        }
    }

    fn harness() -> Harness {
        harness_with(Arc::new(InMemoryStore::new()), normal())
    }

    #[test]
    fn write_is_visible_immediately() {
        let mut h = harness();
        assert!(h.engine.set_value("cmi.location", "p1").is_accepted());
        assert_eq!(h.engine.get_value("cmi.location"), "p1");
        assert_eq!(h.engine.queued_len(), 1);
    }

    #[test]
    fn redundant_write_creates_no_element() {
        let mut h = harness();
        h.engine.set_value("cmi.location", "p1");
        assert_eq!(
            h.engine.set_value("cmi.location", "p1"),
            WriteOutcome::Unchanged
        );
        assert_eq!(h.engine.queued_len(), 1);
        assert_eq!(h.engine.stats().elements_recorded, 1);
    }

    #[test]
    fn read_only_mode_rejects_writes() {
        let store = Arc::new(InMemoryStore::new());
        let mut h = harness_with(store, InitialData::new().with(MODE_KEY, "review", 1.0));
        assert!(h.engine.is_read_only());
        assert!(h.engine.set_value("cmi.score.raw", "100").is_rejected());
        assert_eq!(h.engine.get_value("cmi.score.raw"), "");
        assert_eq!(h.engine.queued_len(), 0);
    }

    #[test]
    fn count_key_write_is_rejected() {
        let mut h = harness();
        h.engine.set_value("cmi.interactions.4.id", "q4");
        assert!(h.engine.set_value("cmi.interactions._count", "0").is_rejected());
        assert_eq!(h.engine.get_value("cmi.interactions._count"), "5");
        assert_eq!(h.engine.queued_len(), 1);
    }

    #[test]
    fn recovered_empty_batch_does_not_block_draining() {
        let body = br#"{"sent":{"5":[],"6":[{"key":"cmi.location","value":"p1","time":3.5,"sequence":0}]}}"#;
        let store = Arc::new(InMemoryStore::with_entry("attempt-1-scorm-data", &body[..]));
        let mut h = harness_with(store, normal());
        assert_eq!(h.engine.pending_ids(), vec![6]);

        assert_eq!(h.engine.run_fallback().unwrap(), 1);
        assert!(h.engine.pending_ids().is_empty());
        assert_eq!(h.fallback.requests().len(), 1);
    }

    #[test]
    fn elements_carry_clock_time_and_sequence() {
        let mut h = harness();
        h.engine.set_value("a", "1");
        h.clock.advance(2.5);
        h.engine.set_value("b", "2");
        h.engine.flush();

        let batch = &h.engine.pending_batches()[0];
        assert_eq!(batch.elements[0].time, 1_000.0);
        assert_eq!(batch.elements[1].time, 1_002.5);
        assert_eq!(batch.elements[0].sequence, 0);
        assert_eq!(batch.elements[1].sequence, 1);
    }

    #[test]
    fn batch_ids_seeded_from_clock() {
        let mut h = harness();
        h.engine.set_value("a", "1");
        assert_eq!(h.engine.flush(), Some(1_000_000));
    }

    #[test]
    fn flush_writes_through() {
        let mut h = harness();
        h.engine.set_value("cmi.location", "p1");
        let id = h.engine.flush().unwrap();

        let stored = h.store.get("attempt-1-scorm-data").unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&stored).unwrap();
        assert_eq!(json["sent"][id.to_string()][0]["value"], "p1");
        assert!(h.engine.health(Instant::now()).durable);
    }

    #[test]
    fn acknowledge_writes_through() {
        let mut h = harness();
        h.engine.set_value("cmi.location", "p1");
        let id = h.engine.flush().unwrap();
        assert!(h.engine.acknowledge(id));
        assert!(!h.engine.acknowledge(id));

        let stored = h.store.get("attempt-1-scorm-data").unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&stored).unwrap();
        assert_eq!(json["sent"], serde_json::json!({}));
    }

    #[test]
    fn acknowledge_never_touches_data_model() {
        let mut h = harness();
        h.engine.set_value("cmi.location", "p1");
        let before = h.engine.data().values();
        h.engine.acknowledge(42);
        h.engine.flush();
        let pending = h.engine.pending_ids();
        h.engine.acknowledge(pending[0]);
        h.engine.acknowledge(pending[0]);
        assert_eq!(h.engine.data().values(), before);
    }

    #[test]
    fn fast_tick_sends_once_per_connection() {
        let mut h = harness();
        h.primary.set_open(true);

        h.engine.set_value("a", "1");
        assert_eq!(h.engine.on_fast_tick(), 1);
        assert_eq!(h.engine.on_fast_tick(), 0);

        h.engine.set_value("b", "2");
        assert_eq!(h.engine.on_fast_tick(), 1);
        assert_eq!(h.primary.sent().len(), 2);
    }

    #[test]
    fn fast_tick_flushes_while_offline() {
        let mut h = harness();
        h.engine.set_value("a", "1");
        assert_eq!(h.engine.on_fast_tick(), 0);
        assert_eq!(h.engine.pending_ids().len(), 1);
        assert_eq!(h.engine.queued_len(), 0);
        assert!(h.primary.sent().is_empty());
    }

    #[test]
    fn reconnect_retransmits_pending_before_queue() {
        let mut h = harness();
        h.primary.set_open(true);
        h.engine.set_value("a", "1");
        h.engine.on_fast_tick();
        let first = h.primary.sent_ids()[0];

        h.primary.set_open(false);
        h.engine.handle_event(TransportEvent::Disconnected);
        h.engine.set_value("b", "2");

        h.primary.clear_sent();
        h.primary.set_open(true);
        h.engine.handle_event(TransportEvent::Connected);

        let sent = h.primary.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].id, first);
        assert_eq!(sent[1].elements[0].key, "b");
        assert!(sent[1].id > first);
    }

    #[test]
    fn acknowledgment_removes_exact_id() {
        let mut h = harness();
        for value in ["1", "2", "3"] {
            h.engine.set_value("a", value);
            h.engine.flush();
        }
        let ids = h.engine.pending_ids();
        h.engine.handle_event(TransportEvent::Acknowledged(ids[1]));
        assert_eq!(h.engine.pending_ids(), vec![ids[0], ids[2]]);
    }

    #[test]
    fn primary_ready_requires_empty_tracker() {
        let mut h = harness();
        h.primary.set_open(true);
        assert!(h.engine.is_primary_ready());

        h.engine.set_value("a", "1");
        h.engine.on_fast_tick();
        assert!(!h.engine.is_primary_ready());

        let id = h.engine.pending_ids()[0];
        h.engine.handle_event(TransportEvent::Acknowledged(id));
        assert!(h.engine.is_primary_ready());
    }

    #[test]
    fn fallback_success_empties_tracker() {
        let mut h = harness();
        h.engine.set_value("a", "1");
        h.engine.flush();
        h.engine.set_value("b", "2");

        assert_eq!(h.engine.run_fallback().unwrap(), 2);
        assert!(h.engine.pending_ids().is_empty());

        let request = h.fallback.last_request().unwrap();
        assert_eq!(request.len(), 2);
    }

    #[test]
    fn fallback_failure_keeps_batches_verbatim() {
        let mut h = harness();
        h.engine.set_value("a", "1");
        h.engine.flush();
        h.engine.set_value("b", "2");
        h.engine.flush();
        let before = h.engine.pending_batches();

        h.fallback.set_failing(true);
        assert!(h.engine.run_fallback().is_err());
        assert_eq!(h.engine.pending_batches(), before);

        h.fallback.set_failing(false);
        h.engine.run_fallback().unwrap();
        let requests = h.fallback.requests();
        assert_eq!(requests[0], requests[1]);
        assert_eq!(requests[1], FallbackRequest::from_batches(&before));
    }

    #[test]
    fn fallback_with_nothing_pending_is_skipped() {
        let mut h = harness();
        assert_eq!(h.engine.run_fallback().unwrap(), 0);
        assert!(h.fallback.requests().is_empty());
    }

    #[test]
    fn health_degrades_and_recovers() {
        let mut h = harness();
        let now = Instant::now();
        h.engine.set_value("a", "1");
        assert!(h.engine.health(now).ok);

        h.fallback.set_failing(true);
        let _ = h.engine.run_fallback();
        let report = h.engine.health(now);
        assert!(!report.ok);
        assert!(report.disconnected);

        h.fallback.set_failing(false);
        h.engine.run_fallback().unwrap();
        assert!(h.engine.health(now).ok);
    }

    #[test]
    fn lifecycle_errors_propagate() {
        let mut h = harness();
        assert!(matches!(
            h.engine.terminate(),
            Err(SyncError::Lifecycle(LifecycleError::NotInitialized))
        ));
        h.engine.initialize().unwrap();
        assert!(matches!(
            h.engine.initialize(),
            Err(SyncError::Lifecycle(LifecycleError::AlreadyInitialized))
        ));
    }

    #[test]
    fn terminate_flushes_and_rejects_writes() {
        let mut h = harness();
        h.engine.initialize().unwrap();
        h.engine.set_value("a", "1");
        h.engine.terminate().unwrap();

        assert_eq!(h.engine.queued_len(), 0);
        assert_eq!(h.engine.pending_ids().len(), 1);
        assert!(h.engine.set_value("a", "2").is_rejected());
        assert_eq!(h.engine.get_value("a"), "1");
        assert_eq!(h.engine.on_fast_tick(), 0);
    }

    #[test]
    fn remote_completion_terminates_once() {
        let mut h = harness();
        h.engine.initialize().unwrap();
        h.engine.set_value("a", "1");

        assert_eq!(
            h.engine.handle_event(TransportEvent::RemoteCompletion),
            Some(HostNotice::RemoteCompletion)
        );
        assert_eq!(h.engine.handle_event(TransportEvent::RemoteCompletion), None);
        assert_eq!(h.engine.session_state(), SessionState::Terminated);
        assert_eq!(h.engine.pending_ids().len(), 1);
    }

    #[test]
    fn restart_recovers_pending_and_values() {
        let store = Arc::new(InMemoryStore::new());
        let pending = {
            let mut h = harness_with(store.clone(), normal());
            h.engine.set_value("cmi.interactions.4.id", "q4");
            h.engine.flush();
            h.engine.pending_ids()
        };

        let h = harness_with(store, normal());
        assert_eq!(h.engine.pending_ids(), pending);
        assert_eq!(h.engine.get_value("cmi.interactions.4.id"), "q4");
        assert_eq!(h.engine.get_value("cmi.interactions._count"), "5");
    }

    #[test]
    fn unavailable_store_still_delivers() {
        let primary = MockPrimary::new();
        let fallback = MockFallback::new();
        let mut engine = Engine::new(
            EngineConfig::new("1", ""),
            normal(),
            Arc::new(UnavailableStore::new()),
            Box::new(primary),
            Arc::new(fallback),
        );

        engine.set_value("a", "1");
        engine.flush();
        assert!(!engine.health(Instant::now()).durable);
        assert_eq!(engine.stats().durable_failures, 1);
        assert_eq!(engine.run_fallback().unwrap(), 1);
    }
}
