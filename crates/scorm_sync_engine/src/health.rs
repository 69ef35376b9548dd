//! Connectivity and durability health for external display.

use std::time::{Duration, Instant};

/// Snapshot of sync health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthReport {
    /// Nothing is waiting, or a transport is confirmed working.
    pub ok: bool,
    /// Data is waiting and no transport works, or did so within the linger
    /// period.
    pub disconnected: bool,
    /// The last write to the durable store succeeded.
    pub durable: bool,
    /// Batches awaiting acknowledgment.
    pub pending_batches: usize,
    /// Elements not yet flushed into a batch.
    pub queued_elements: usize,
}

impl Default for HealthReport {
    fn default() -> Self {
        Self {
            ok: true,
            disconnected: false,
            durable: false,
            pending_batches: 0,
            queued_elements: 0,
        }
    }
}

/// Inputs to one health evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthInputs {
    /// Batches awaiting acknowledgment.
    pub pending_batches: usize,
    /// Elements not yet flushed.
    pub queued_elements: usize,
    /// Primary channel open with nothing outstanding.
    pub primary_ready: bool,
    /// Last write to the durable store succeeded.
    pub durable: bool,
}

/// Derives [`HealthReport`]s and debounces the disconnected signal.
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    linger: Duration,
    last_warning: Option<Instant>,
    degraded: bool,
}

impl HealthMonitor {
    /// Creates a monitor whose disconnected signal lingers for `linger`.
    pub fn new(linger: Duration) -> Self {
        Self {
            linger,
            last_warning: None,
            degraded: false,
        }
    }

    /// Records a fallback failure.
    pub fn mark_degraded(&mut self) {
        self.degraded = true;
    }

    /// Records a successful exchange on either transport.
    pub fn mark_recovered(&mut self) {
        self.degraded = false;
    }

    /// Returns true between a fallback failure and the next success.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Evaluates health at `now`.
    pub fn evaluate(&mut self, now: Instant, inputs: HealthInputs) -> HealthReport {
        let has_data = inputs.pending_batches > 0 || inputs.queued_elements > 0;
        let transport_working = inputs.primary_ready || !self.degraded;
        let ok = !has_data || transport_working;

        if !ok {
            self.last_warning = Some(now);
        }
        let lingering = self
            .last_warning
            .is_some_and(|at| now.saturating_duration_since(at) < self.linger);

        HealthReport {
            ok,
            disconnected: !ok || lingering,
            durable: inputs.durable,
            pending_batches: inputs.pending_batches,
            queued_elements: inputs.queued_elements,
        }
    }
}
