//! Switchboard Core - pub/sub dispatch, backends and services.

pub mod backends;
pub mod dispatch;
pub mod services;

pub use dispatch::{
    DEFAULT_TASK_CAPACITY, DispatchClient, DispatchConfig, DispatchError, DispatchStats,
    DispatchStatsSnapshot, HandlerRef, PubSubHandler, PubSubRouter, TaskRing, TrackedTask,
};
pub use switchboard_traits::{
    ConnectionError, ConnectionResult, Message, MessageKind, PubSubConnection, PubSubConnector,
};
