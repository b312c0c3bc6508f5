//! In-process pub/sub broker
//!
//! Every subscription connection gets its own unbounded queue. Publishing
//! fans a message out to every connection subscribed to its channel, in
//! publish order. Subscribe requests are confirmed with a control message,
//! the way Redis confirms them.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use switchboard_traits::{
    ConnectionError, ConnectionResult, Message, MessageKind, PubSubConnection, PubSubConnector,
};
use tokio::sync::mpsc;

struct Subscriber {
    channels: HashSet<String>,
    tx: mpsc::UnboundedSender<Message>,
}

#[derive(Default)]
struct BrokerInner {
    subscribers: Mutex<HashMap<u64, Subscriber>>,
    next_id: AtomicU64,
    initialised: AtomicBool,
    closed: AtomicBool,
    keepalive: Option<Duration>,
}

impl BrokerInner {
    fn remove(&self, id: u64) {
        self.subscribers.lock().remove(&id);
    }
}

/// In-memory pub/sub broker
#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<BrokerInner>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make idle connections yield a keepalive (`Ok(None)`) every `interval`.
    pub fn with_keepalive(interval: Duration) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                keepalive: Some(interval),
                ..Default::default()
            }),
        }
    }

    /// Deliver a message to every subscriber of `channel`.
    ///
    /// Returns the number of connections that received it.
    pub fn deliver(&self, channel: &str, payload: &str) -> usize {
        let subscribers = self.inner.subscribers.lock();
        subscribers
            .values()
            .filter(|subscriber| subscriber.channels.contains(channel))
            .filter(|subscriber| subscriber.tx.send(Message::data(channel, payload)).is_ok())
            .count()
    }

    /// Push a raw message to every open connection, subscribed or not.
    ///
    /// Stands in for traffic a real server sends unprompted (keyspace
    /// notifications, messages on channels left over from an earlier
    /// subscription).
    pub fn inject(&self, message: Message) -> usize {
        let subscribers = self.inner.subscribers.lock();
        subscribers
            .values()
            .filter(|subscriber| subscriber.tx.send(message.clone()).is_ok())
            .count()
    }

    /// Channels with at least one subscriber, sorted.
    pub fn subscriptions(&self) -> Vec<String> {
        let subscribers = self.inner.subscribers.lock();
        subscribers
            .values()
            .flat_map(|subscriber| subscriber.channels.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Number of subscription connections currently open.
    pub fn open_connections(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    pub fn is_initialised(&self) -> bool {
        self.inner.initialised.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> ConnectionResult<()> {
        if self.is_closed() {
            return Err(ConnectionError::NotOpen);
        }
        Ok(())
    }
}

#[async_trait]
impl PubSubConnector for MemoryBroker {
    fn name(&self) -> &str {
        "memory"
    }

    async fn initialise(&self) -> ConnectionResult<()> {
        self.ensure_open()?;
        self.inner.initialised.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn open_pubsub(&self) -> ConnectionResult<Box<dyn PubSubConnection>> {
        self.ensure_open()?;
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.subscribers.lock().insert(
            id,
            Subscriber {
                channels: HashSet::new(),
                tx,
            },
        );

        Ok(Box::new(MemoryPubSub {
            id,
            broker: self.inner.clone(),
            rx,
            open: true,
        }))
    }

    async fn publish(&self, channel: &str, payload: &str) -> ConnectionResult<usize> {
        self.ensure_open()?;
        Ok(self.deliver(channel, payload))
    }

    async fn close(&self) -> ConnectionResult<()> {
        self.inner.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Subscription connection to a `MemoryBroker`
pub struct MemoryPubSub {
    id: u64,
    broker: Arc<BrokerInner>,
    rx: mpsc::UnboundedReceiver<Message>,
    open: bool,
}

#[async_trait]
impl PubSubConnection for MemoryPubSub {
    async fn subscribe(&mut self, channel: &str) -> ConnectionResult<()> {
        if !self.open {
            return Err(ConnectionError::NotOpen);
        }

        let mut subscribers = self.broker.subscribers.lock();
        let subscriber = subscribers
            .get_mut(&self.id)
            .ok_or(ConnectionError::NotOpen)?;
        if subscriber.channels.insert(channel.to_string()) {
            let _ = subscriber
                .tx
                .send(Message::control(MessageKind::Subscribe, channel));
        }
        Ok(())
    }

    async fn next_message(&mut self) -> ConnectionResult<Option<Message>> {
        if !self.open {
            return Err(ConnectionError::NotOpen);
        }

        let received = match self.broker.keepalive {
            Some(interval) => match tokio::time::timeout(interval, self.rx.recv()).await {
                Ok(received) => received,
                Err(_) => return Ok(None),
            },
            None => self.rx.recv().await,
        };

        received
            .map(Some)
            .ok_or_else(|| ConnectionError::Closed("subscriber removed from broker".to_string()))
    }

    async fn close(&mut self) -> ConnectionResult<()> {
        if self.open {
            self.open = false;
            self.broker.remove(self.id);
        }
        Ok(())
    }
}

impl Drop for MemoryPubSub {
    fn drop(&mut self) {
        if self.open {
            self.broker.remove(self.id);
        }
    }
}
