//! # SCORM Sync Protocol
//!
//! Message types and JSON codecs shared by the sync engine and the
//! receiving server.
//!
//! This crate provides:
//! - [`Element`] - a single timestamped change to the data model
//! - [`Batch`] - an ordered group of elements under one batch id
//! - Primary channel frames ([`BatchMessage`], [`ServerMessage`])
//! - Fallback request/response bodies ([`FallbackRequest`], [`FallbackResponse`])
//! - The durable snapshot layout ([`OutboxSnapshot`])
//!
//! This is a pure protocol crate with no I/O operations.
//!
//! ## Wire format
//!
//! All messages are JSON objects. Batch ids appear as object keys in the
//! fallback request and in the durable snapshot, so they travel as decimal
//! strings there and as numbers everywhere else.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod element;
mod error;
mod messages;

pub use element::{Batch, BatchId, Element};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{
    BatchMessage, FallbackRequest, FallbackResponse, OutboxSnapshot, ServerMessage,
    WireMessage, COMPLETION_COMPLETED,
};
