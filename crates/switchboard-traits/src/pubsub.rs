//! Pub/sub connection contracts
//!
//! A backend exposes two levels of handle. The `PubSubConnector` is the shared
//! client: it is set up once, publishes, and is closed at shutdown. A
//! `PubSubConnection` is a dedicated subscription connection opened by the
//! dispatch listener and owned by it for the listener's whole lifetime.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Kind of message yielded by a subscription connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// A user message published on a channel
    Data,
    /// Confirmation of a subscribe request
    Subscribe,
    /// Confirmation of an unsubscribe request
    Unsubscribe,
    /// Reply to a keepalive ping
    Pong,
}

impl MessageKind {
    /// Whether this kind carries a user payload
    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data)
    }
}

/// Message received on a subscription connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub kind: MessageKind,
    pub channel: String,
    pub payload: String,
}

impl Message {
    /// Create a user data message
    pub fn data(channel: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Data,
            channel: channel.into(),
            payload: payload.into(),
        }
    }

    /// Create a control message (subscription confirmations, pongs)
    pub fn control(kind: MessageKind, channel: impl Into<String>) -> Self {
        Self {
            kind,
            channel: channel.into(),
            payload: String::new(),
        }
    }

    pub fn is_data(&self) -> bool {
        self.kind.is_data()
    }
}

/// Dedicated subscription connection
///
/// Implementations must release the underlying resource when dropped, so a
/// listener that is aborted mid-await still gives its connection back.
#[async_trait]
pub trait PubSubConnection: Send {
    /// Subscribe to a channel. Subscribing twice to the same channel is a no-op.
    ///
    /// Fails with `ConnectionError::NotOpen` once the connection was closed.
    async fn subscribe(&mut self, channel: &str) -> Result<()>;

    /// Wait for the next message.
    ///
    /// `Ok(None)` is a keepalive poll with nothing to deliver. An error means
    /// the connection is no longer usable.
    async fn next_message(&mut self) -> Result<Option<Message>>;

    /// Close the connection and release its resources.
    async fn close(&mut self) -> Result<()>;
}

/// Shared pub/sub client
#[async_trait]
pub trait PubSubConnector: Send + Sync + 'static {
    /// Backend name used in logs
    fn name(&self) -> &str;

    /// Establish the shared connection (publish path, health pings).
    async fn initialise(&self) -> Result<()>;

    /// Open a dedicated subscription connection.
    async fn open_pubsub(&self) -> Result<Box<dyn PubSubConnection>>;

    /// Publish a payload, returning the number of receivers.
    async fn publish(&self, channel: &str, payload: &str) -> Result<usize>;

    /// Release the shared connection.
    async fn close(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_kinds() {
        let data = Message::data("alerts", "p1");
        assert!(data.is_data());
        assert_eq!(data.channel, "alerts");
        assert_eq!(data.payload, "p1");

        let control = Message::control(MessageKind::Subscribe, "alerts");
        assert!(!control.is_data());
        assert!(control.payload.is_empty());
    }

    #[test]
    fn test_message_kind_serialization() {
        let json = serde_json::to_string(&MessageKind::Unsubscribe).unwrap();
        assert_eq!(json, "\"unsubscribe\"");

        let message: Message =
            serde_json::from_str(r#"{"kind":"data","channel":"logs","payload":"x"}"#).unwrap();
        assert_eq!(message, Message::data("logs", "x"));
    }
}
