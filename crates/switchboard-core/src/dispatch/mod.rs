//! Pub/Sub Dispatch Layer
//!
//! Multiplexes any number of channel handlers onto a single subscription
//! connection and fans every inbound message out as its own tokio task.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            DispatchClient               │
//! │  - register / include_router            │
//! │  - initialise / shutdown                │
//! └─────────────────────────────────────────┘
//!              │ spawns exactly one
//!              ▼
//! ┌─────────────────────────────────────────┐
//! │            Listener loop                │
//! │  - subscribes to a route snapshot       │
//! │  - looks up PubSubRouter per message    │
//! └─────────────────────────────────────────┘
//!              │ tokio::spawn per message
//!    ┌─────────┼─────────┐
//!    ▼         ▼         ▼
//! handler   handler   handler   (tracked in a bounded TaskRing)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use switchboard_core::{DispatchClient, PubSubRouter};
//!
//! let mut router = PubSubRouter::with_prefix("orders.");
//! router.register("created", |payload: String| async move {
//!     tracing::info!(%payload, "order created");
//!     anyhow::Ok(())
//! });
//!
//! let client = DispatchClient::new(connector);
//! client.include_router(&router)?;
//! client.initialise().await?;
//! // ...
//! client.shutdown().await?;
//! ```
//!
//! Routes must be registered before `initialise`: the listener subscribes to
//! a snapshot of the router taken when it starts, and the client refuses any
//! registration afterwards.

mod client;
mod error;
mod handler;
mod listener;
mod router;
mod stats;
mod task_ring;

pub use client::{DispatchClient, DispatchConfig};
pub use error::{DispatchError, Result};
pub use handler::{HandlerRef, PubSubHandler};
pub use router::PubSubRouter;
pub use stats::{DispatchStats, DispatchStatsSnapshot};
pub use task_ring::{DEFAULT_TASK_CAPACITY, TaskRing, TrackedTask};
