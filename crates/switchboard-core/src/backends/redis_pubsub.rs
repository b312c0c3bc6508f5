//! Redis pub/sub backend
//!
//! Publishing and health pings share one multiplexed connection. Each
//! listener opens its own dedicated pub/sub connection, since a Redis
//! connection in subscribe mode cannot issue regular commands.

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use redis::AsyncCommands;
use redis::aio::{MultiplexedConnection, PubSub};
use serde::Deserialize;
use switchboard_traits::{
    ConnectionError, ConnectionResult, Message, PubSubConnection, PubSubConnector,
};
use tracing::{debug, warn};

/// Redis connection settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub database: i64,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    6379
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: 0,
            password: None,
        }
    }
}

impl RedisConfig {
    /// Connection URL, e.g. `redis://:secret@127.0.0.1:6379/0`
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.host, self.port, self.database
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.database),
        }
    }
}

fn backend_error(error: redis::RedisError) -> ConnectionError {
    ConnectionError::backend(error)
}

/// Convert a raw Redis message. Payloads that are not valid UTF-8 are decoded
/// lossily so one bad publisher cannot take the connection down.
fn decode_message(message: &redis::Msg) -> Message {
    let channel = message.get_channel_name();
    let bytes = message.get_payload_bytes();
    let payload = match std::str::from_utf8(bytes) {
        Ok(payload) => payload.to_string(),
        Err(e) => {
            warn!(channel, error = %e, "Non UTF-8 payload, decoding lossily");
            String::from_utf8_lossy(bytes).into_owned()
        }
    };
    Message::data(channel, payload)
}

/// Shared Redis client
pub struct RedisConnector {
    client: redis::Client,
    connection: Mutex<Option<MultiplexedConnection>>,
}

impl RedisConnector {
    pub fn new(config: &RedisConfig) -> ConnectionResult<Self> {
        let client = redis::Client::open(config.url()).map_err(backend_error)?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
        })
    }

    fn shared_connection(&self) -> ConnectionResult<MultiplexedConnection> {
        self.connection
            .lock()
            .as_ref()
            .cloned()
            .ok_or(ConnectionError::NotOpen)
    }
}

#[async_trait]
impl PubSubConnector for RedisConnector {
    fn name(&self) -> &str {
        "redis"
    }

    async fn initialise(&self) -> ConnectionResult<()> {
        let mut connection = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(backend_error)?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(backend_error)?;
        debug!(reply = %pong, "Redis connection established");

        *self.connection.lock() = Some(connection);
        Ok(())
    }

    async fn open_pubsub(&self) -> ConnectionResult<Box<dyn PubSubConnection>> {
        let pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(backend_error)?;
        Ok(Box::new(RedisPubSub {
            pubsub: Some(pubsub),
        }))
    }

    async fn publish(&self, channel: &str, payload: &str) -> ConnectionResult<usize> {
        let mut connection = self.shared_connection()?;
        let receivers: usize = connection
            .publish(channel, payload)
            .await
            .map_err(backend_error)?;
        Ok(receivers)
    }

    async fn close(&self) -> ConnectionResult<()> {
        self.connection.lock().take();
        Ok(())
    }
}

/// Dedicated Redis subscription connection
///
/// Subscription confirmations are consumed by the driver; only data messages
/// are yielded.
pub struct RedisPubSub {
    pubsub: Option<PubSub>,
}

impl RedisPubSub {
    fn pubsub(&mut self) -> ConnectionResult<&mut PubSub> {
        self.pubsub.as_mut().ok_or(ConnectionError::NotOpen)
    }
}

#[async_trait]
impl PubSubConnection for RedisPubSub {
    async fn subscribe(&mut self, channel: &str) -> ConnectionResult<()> {
        self.pubsub()?
            .subscribe(channel)
            .await
            .map_err(backend_error)
    }

    async fn next_message(&mut self) -> ConnectionResult<Option<Message>> {
        let mut messages = std::pin::pin!(self.pubsub()?.on_message());
        let message = messages.next().await.ok_or_else(|| {
            ConnectionError::Closed("Redis pub/sub stream ended".to_string())
        })?;

        Ok(Some(decode_message(&message)))
    }

    async fn close(&mut self) -> ConnectionResult<()> {
        self.pubsub.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_without_password() {
        let config = RedisConfig {
            database: 2,
            ..Default::default()
        };
        assert_eq!(config.url(), "redis://127.0.0.1:6379/2");
    }

    #[test]
    fn test_url_with_password() {
        let config = RedisConfig {
            host: "cache".to_string(),
            port: 6380,
            database: 0,
            password: Some("secret".to_string()),
        };
        assert_eq!(config.url(), "redis://:secret@cache:6380/0");
    }

    fn raw_message(channel: &str, payload: &[u8]) -> redis::Msg {
        let value = redis::Value::Array(vec![
            redis::Value::BulkString(b"message".to_vec()),
            redis::Value::BulkString(channel.as_bytes().to_vec()),
            redis::Value::BulkString(payload.to_vec()),
        ]);
        redis::Msg::from_value(&value).unwrap()
    }

    #[test]
    fn test_decode_message() {
        let message = decode_message(&raw_message("alerts", b"p1"));
        assert_eq!(message, Message::data("alerts", "p1"));
    }

    #[test]
    fn test_invalid_utf8_payload_does_not_fail() {
        let message = decode_message(&raw_message("alerts", &[b'o', b'k', 0xff, 0xfe]));
        assert_eq!(message, Message::data("alerts", "ok\u{FFFD}\u{FFFD}"));
    }

    #[tokio::test]
    async fn test_publish_requires_initialise() {
        let connector = RedisConnector::new(&RedisConfig::default()).unwrap();
        assert_eq!(
            connector.publish("alerts", "p").await,
            Err(ConnectionError::NotOpen)
        );
    }

    #[tokio::test]
    async fn test_closed_pubsub_rejects_subscribe() {
        let mut pubsub = RedisPubSub { pubsub: None };
        assert_eq!(
            pubsub.subscribe("alerts").await,
            Err(ConnectionError::NotOpen)
        );
    }
}
