//! # SCORM Sync Server
//!
//! Reference receiving endpoint for the SCORM sync engine.
//!
//! This crate provides:
//! - Primary channel frame handling (`{batch_id, elements}` in,
//!   `{received}` out)
//! - The fallback endpoint (every pending batch in, `received_batches` out)
//! - Batch id deduplication and last-write-wins application per key
//! - Anti-forgery tokens (HMAC-SHA256, hex encoded)
//! - Remote completion notices
//!
//! # Delivery semantics
//!
//! Clients deliver at least once. The server remembers every batch id it
//! has stored per session and acknowledges a repeated id without applying
//! it again. Elements are applied by timestamp, not arrival order, so
//! batches may arrive in any order.
//!
//! # Authentication
//!
//! ```rust
//! use scorm_sync_server::{ServerConfig, SyncServer};
//!
//! let server = SyncServer::new(ServerConfig::default().with_auth(b"secret".to_vec()));
//! let token = server.create_token("42").unwrap();
//! assert!(server.validate_token("42", Some(&token)).is_ok());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod auth;
mod config;
mod error;
mod handler;
mod receipts;
mod server;

pub use auth::TokenValidator;
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler};
pub use receipts::{ReceiptLog, StoredValue};
pub use server::{fallback_path, session_from_path, SyncServer, FALLBACK_SUFFIX};
