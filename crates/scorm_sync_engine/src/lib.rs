//! # SCORM Sync Engine
//!
//! Offline-tolerant synchronization of an activity's data model with a
//! remote record store.
//!
//! This crate provides:
//! - Data model store with list count derivation
//! - Change queue and batch tracker with write-through durability
//! - Primary (persistent channel) and fallback (HTTP) transport abstractions
//! - Session state machine
//! - Health monitor with a debounced disconnected signal
//! - A tokio flush scheduler and the activity-facing API
//!
//! ## Architecture
//!
//! Every accepted write is applied to the data model at once and queued as
//! an element. Flushing turns the queue into a numbered batch, recorded in
//! the batch tracker and persisted to the durable store before anything is
//! sent. Batches leave the tracker only when the server confirms their id.
//!
//! ```text
//! set_value ─▶ DataModel ─▶ queue ─flush─▶ tracker ─▶ durable store
//!                                            │
//!                        fast tick ─▶ primary ┤ ◀─ received: id
//!                        slow tick ─▶ fallback┘ ◀─ received_batches
//! ```
//!
//! ## Key Invariants
//!
//! - An element is in exactly one of the queue or one tracked batch
//! - A batch is removed only on acknowledgment of its exact id
//! - Delivery is at-least-once; the server deduplicates by batch id
//! - The tracker is persisted before `flush` and `acknowledge` return
//! - Recovered batches are merged into the data model before any write

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod api;
mod clock;
mod config;
mod datamodel;
mod driver;
mod durable;
mod engine;
mod error;
mod health;
mod http;
mod outbox;
mod session;
mod transport;

pub use api::{ApiErrorCode, ScormApi};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use datamodel::{
    list_memberships, DataModel, DataValue, InitialData, WriteOutcome, COMPLETION_KEY,
    COUNT_SUFFIX, MODE_KEY, MODE_NORMAL, MODE_REVIEW, STATUS_COMPLETED,
};
pub use driver::{SessionHandle, SyncDriver};
pub use durable::DurableOutbox;
pub use engine::{Engine, EngineStats, HostNotice};
pub use error::{SyncError, SyncResult};
pub use health::{HealthInputs, HealthMonitor, HealthReport};
pub use http::{
    url_path, AntiForgeryToken, HttpClient, HttpFallbackTransport, HttpResponse, LoopbackClient,
    LoopbackServer, StaticToken, CSRF_HEADER, JSON_CONTENT_TYPE,
};
pub use outbox::Outbox;
pub use session::{LifecycleError, Session, SessionState};
pub use transport::{
    transport_channel, EventReceiver, EventSender, FallbackTransport, MockFallback, MockPrimary,
    OfflinePrimary, PrimaryTransport, TransportEvent,
};
