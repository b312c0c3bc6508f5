//! Switchboard Traits - Shared pub/sub connection contracts.
//!
//! This crate provides the interfaces the dispatch core consumes from a
//! pub/sub capable backend:
//! - `PubSubConnector`: shared client handle (setup, publish, teardown)
//! - `PubSubConnection`: a dedicated subscription connection
//! - `Message`, `MessageKind`: what a subscription connection yields
//! - `ConnectionError`: failures reported by backends

pub mod error;
pub mod pubsub;

// ── Top-level re-exports ─────────────────────────────────────────────

pub use error::{ConnectionError, Result as ConnectionResult};
pub use pubsub::{Message, MessageKind, PubSubConnection, PubSubConnector};
