//! Flush scheduler: the tokio task that drives an [`Engine`].
//!
//! One task owns the timers and the transport event feed. Each wake-up locks
//! the engine, runs one handler to completion and releases the lock before
//! the next await. The fallback call is the only blocking operation; it runs
//! on the blocking pool and its outcome comes back as a command.

use crate::datamodel::WriteOutcome;
use crate::engine::{Engine, HostNotice};
use crate::error::{SyncError, SyncResult};
use crate::health::HealthReport;
use crate::session::SessionState;
use crate::transport::{EventReceiver, TransportEvent};
use parking_lot::Mutex;
use scorm_sync_protocol::FallbackResponse;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

enum Command {
    /// Local termination happened; notify the host and deliver now.
    Terminated,
    /// A fallback call finished.
    FallbackDone(SyncResult<FallbackResponse>),
    Shutdown,
}

/// Host-side handle to a driven engine.
///
/// Cheap to clone. The driver keeps running while any handle is alive.
#[derive(Clone)]
pub struct SessionHandle {
    engine: Arc<Mutex<Engine>>,
    commands: UnboundedSender<Command>,
    health: watch::Receiver<HealthReport>,
}

impl SessionHandle {
    /// Starts the session.
    ///
    /// # Errors
    ///
    /// Fails unless the session is uninitialized.
    pub fn initialize(&self) -> SyncResult<()> {
        self.engine.lock().initialize()
    }

    /// Ends the session and starts an immediate fallback attempt.
    ///
    /// # Errors
    ///
    /// Fails unless the session is initialized.
    pub fn terminate(&self) -> SyncResult<()> {
        self.engine.lock().terminate()?;
        if self.commands.send(Command::Terminated).is_err() {
            debug!("driver stopped, final delivery skipped");
        }
        Ok(())
    }

    /// Reads a data model value.
    pub fn get_value(&self, key: &str) -> String {
        self.engine.lock().get_value(key).to_string()
    }

    /// Writes a data model value.
    pub fn set_value(&self, key: &str, value: &str) -> WriteOutcome {
        self.engine.lock().set_value(key, value)
    }

    /// Returns the session state.
    pub fn session_state(&self) -> SessionState {
        self.engine.lock().session_state()
    }

    /// Returns the most recently published health.
    pub fn health(&self) -> HealthReport {
        *self.health.borrow()
    }

    /// Returns a receiver notified on every health evaluation.
    pub fn subscribe_health(&self) -> watch::Receiver<HealthReport> {
        self.health.clone()
    }

    /// Runs `f` with exclusive access to the engine.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut Engine) -> R) -> R {
        f(&mut self.engine.lock())
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle").finish_non_exhaustive()
    }
}

/// A running flush scheduler.
pub struct SyncDriver {
    handle: SessionHandle,
    notices: Option<UnboundedReceiver<HostNotice>>,
    task: JoinHandle<()>,
}

impl SyncDriver {
    /// Spawns the scheduler for `engine` on the current tokio runtime.
    ///
    /// `events` is the feed the engine's primary transport reports into.
    pub fn spawn(engine: Engine, events: EventReceiver) -> Self {
        let fast_period = engine.config().fast_period;
        let slow_period = engine.config().slow_period;
        let health_period = engine.config().health_period;

        let engine = Arc::new(Mutex::new(engine));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let (health_tx, health_rx) = watch::channel(HealthReport::default());

        let start = Instant::now();
        let driver = DriverLoop {
            engine: Arc::clone(&engine),
            events: Some(events),
            commands: command_rx,
            reply: command_tx.downgrade(),
            notices: notice_tx,
            health: health_tx,
            fast: ticker(start, fast_period),
            slow: ticker(start, slow_period),
            health_tick: ticker(start, health_period),
            fallback_in_flight: false,
            fallback_rerun: false,
        };
        let task = tokio::spawn(driver.run());

        Self {
            handle: SessionHandle {
                engine,
                commands: command_tx,
                health: health_rx,
            },
            notices: Some(notice_rx),
            task,
        }
    }

    /// Returns a handle for host calls.
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Takes the host notice feed. Returns `None` after the first call.
    pub fn take_notices(&mut self) -> Option<UnboundedReceiver<HostNotice>> {
        self.notices.take()
    }

    /// Stops the scheduler and waits for it to exit.
    ///
    /// An in-flight fallback call is left to finish on its own; its outcome
    /// is discarded and the batches it carried stay pending.
    pub async fn shutdown(self) {
        let _ = self.handle.commands.send(Command::Shutdown);
        let _ = self.task.await;
    }
}

fn ticker(start: Instant, period: std::time::Duration) -> Interval {
    let mut interval = interval_at(start + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

struct DriverLoop {
    engine: Arc<Mutex<Engine>>,
    events: Option<EventReceiver>,
    commands: UnboundedReceiver<Command>,
    reply: WeakUnboundedSender<Command>,
    notices: UnboundedSender<HostNotice>,
    health: watch::Sender<HealthReport>,
    fast: Interval,
    slow: Interval,
    health_tick: Interval,
    fallback_in_flight: bool,
    fallback_rerun: bool,
}

impl DriverLoop {
    async fn run(mut self) {
        info!("sync driver started");
        loop {
            tokio::select! {
                _ = self.fast.tick() => {
                    self.engine.lock().on_fast_tick();
                }
                _ = self.slow.tick() => {
                    let terminated = self.engine.lock().session_state().is_terminated();
                    if !terminated {
                        self.start_fallback();
                    }
                }
                _ = self.health_tick.tick() => {
                    let report = self.engine.lock().health(std::time::Instant::now());
                    self.health.send_replace(report);
                }
                event = next_event(&mut self.events) => match event {
                    Some(event) => self.on_event(event),
                    None => {
                        debug!("transport event feed closed");
                        self.events = None;
                    }
                },
                command = self.commands.recv() => match command {
                    Some(Command::Terminated) => {
                        self.notify(HostNotice::Terminated);
                        self.start_fallback();
                    }
                    Some(Command::FallbackDone(result)) => {
                        self.fallback_in_flight = false;
                        self.engine.lock().complete_fallback(result);
                        if std::mem::take(&mut self.fallback_rerun) {
                            self.start_fallback();
                        }
                    }
                    Some(Command::Shutdown) | None => break,
                },
            }
        }
        self.engine.lock().close();
        info!("sync driver stopped");
    }

    fn on_event(&mut self, event: TransportEvent) {
        let notice = self.engine.lock().handle_event(event);
        if let Some(notice) = notice {
            self.notify(notice);
            if notice == HostNotice::RemoteCompletion {
                self.notify(HostNotice::Terminated);
                self.start_fallback();
            }
        }
    }

    fn notify(&self, notice: HostNotice) {
        if self.notices.send(notice).is_err() {
            debug!(?notice, "host notice dropped");
        }
    }

    fn start_fallback(&mut self) {
        if self.fallback_in_flight {
            self.fallback_rerun = true;
            return;
        }
        let prepared = {
            let mut engine = self.engine.lock();
            engine
                .prepare_fallback()
                .map(|request| (request, engine.fallback_transport()))
        };
        let Some((request, transport)) = prepared else {
            return;
        };
        let Some(reply) = self.reply.upgrade() else {
            return;
        };

        self.fallback_in_flight = true;
        debug!(batches = request.len(), "fallback attempt started");
        let call = tokio::task::spawn_blocking(move || transport.send(&request));
        tokio::spawn(async move {
            let result = match call.await {
                Ok(result) => result,
                Err(e) => Err(SyncError::transport_retryable(format!(
                    "fallback call aborted: {e}"
                ))),
            };
            let _ = reply.send(Command::FallbackDone(result));
        });
    }
}

async fn next_event(events: &mut Option<EventReceiver>) -> Option<TransportEvent> {
    match events {
        Some(events) => events.recv().await,
        None => std::future::pending().await,
    }
}
