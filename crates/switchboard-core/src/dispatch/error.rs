//! Error types for the dispatch client

use switchboard_traits::ConnectionError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Routes were changed, or `initialise` was called again, after the
    /// listener had been created.
    #[error("PubSub listener already created")]
    AlreadyListening,

    #[error("PubSub connection failed: {0}")]
    Connection(#[from] ConnectionError),

    /// The listener exited before it finished subscribing.
    #[error("PubSub listener stopped before it was ready")]
    ListenerStopped,
}

pub type Result<T> = std::result::Result<T, DispatchError>;
