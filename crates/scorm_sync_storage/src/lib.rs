//! # SCORM Sync Storage
//!
//! Durable local store backends for the sync engine.
//!
//! A durable store is a small, best-effort key/value blob store. The engine
//! keeps one entry per session holding every batch it has minted but the
//! server has not yet confirmed, so a restarted process can resume without
//! losing committed state.
//!
//! ## Design Principles
//!
//! - Stores are opaque: values are bytes, the engine owns the format
//! - Every `put` replaces the whole value for a key
//! - A store may be unavailable; callers treat that as a capability, not a
//!   fatal condition
//! - Must be `Send + Sync` so one store can be shared by engine and tools
//!
//! ## Available Backends
//!
//! - [`InMemoryStore`] - For testing and for simulating restarts in-process
//! - [`FileStore`] - One file per key in a directory, replaced atomically
//! - [`UnavailableStore`] - A store that is never available
//!
//! ## Example
//!
//! ```rust
//! use scorm_sync_storage::{DurableStore, InMemoryStore};
//!
//! let store = InMemoryStore::new();
//! store.put("attempt-1-scorm-data", b"{\"sent\":{}}").unwrap();
//! let value = store.get("attempt-1-scorm-data").unwrap();
//! assert_eq!(value.as_deref(), Some(&b"{\"sent\":{}}"[..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;
mod unavailable;

pub use backend::DurableStore;
pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use unavailable::UnavailableStore;
