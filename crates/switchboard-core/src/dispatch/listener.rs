//! Listener loop: subscribe once, then dispatch every inbound message.

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use switchboard_traits::{ConnectionResult, Message, PubSubConnection, PubSubConnector};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::handler::HandlerRef;
use super::router::PubSubRouter;
use super::stats::DispatchStats;
use super::task_ring::{TaskRing, TrackedTask};

/// Reports the outcome of the subscription phase back to `initialise`.
pub(crate) type ReadySender = oneshot::Sender<ConnectionResult<()>>;

pub(crate) struct Listener {
    connector: Arc<dyn PubSubConnector>,
    router: Arc<RwLock<PubSubRouter>>,
    tasks: Arc<Mutex<TaskRing>>,
    stats: Arc<DispatchStats>,
    listen_lock: Arc<tokio::sync::Mutex<()>>,
    next_sequence: u64,
}

impl Listener {
    pub(crate) fn new(
        connector: Arc<dyn PubSubConnector>,
        router: Arc<RwLock<PubSubRouter>>,
        tasks: Arc<Mutex<TaskRing>>,
        stats: Arc<DispatchStats>,
        listen_lock: Arc<tokio::sync::Mutex<()>>,
    ) -> Self {
        Self {
            connector,
            router,
            tasks,
            stats,
            listen_lock,
            next_sequence: 1,
        }
    }

    /// Run until cancelled or until the connection fails.
    ///
    /// The guard is declared before the connection so it is released last on
    /// every exit path, including abort.
    pub(crate) async fn run(mut self, cancel: CancellationToken, ready: ReadySender) {
        let listen_lock = self.listen_lock.clone();
        let _guard = listen_lock.lock().await;

        let mut connection = match self.connector.open_pubsub().await {
            Ok(connection) => connection,
            Err(e) => {
                error!(
                    backend = self.connector.name(),
                    error = %e,
                    "Failed to open PubSub connection"
                );
                let _ = ready.send(Err(e));
                return;
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("PubSub listener cancelled");
            }
            _ = self.listen(&mut *connection, ready) => {}
        }

        if let Err(e) = connection.close().await {
            warn!(error = %e, "Failed to close PubSub connection");
        }
        info!(backend = self.connector.name(), "PubSub listener stopped");
    }

    async fn listen(&mut self, connection: &mut dyn PubSubConnection, ready: ReadySender) {
        // Routes registered after this point are never subscribed to.
        let channels = self.router.read().channels();
        for channel in &channels {
            if let Err(e) = connection.subscribe(channel).await {
                error!(channel = %channel, error = %e, "Failed to subscribe to channel");
                let _ = ready.send(Err(e));
                return;
            }
        }
        info!(
            backend = self.connector.name(),
            channels = channels.len(),
            "PubSub listener subscribed"
        );
        let _ = ready.send(Ok(()));

        loop {
            let message = match connection.next_message().await {
                Ok(Some(message)) => message,
                Ok(None) => continue,
                Err(e) => {
                    error!(error = %e, "PubSub connection failed");
                    return;
                }
            };

            if self.dispatch(message) {
                // Hand control back so a burst of messages cannot starve the
                // handler tasks.
                tokio::task::yield_now().await;
            }
        }
    }

    /// Route one message. Returns true if a handler task was spawned.
    fn dispatch(&mut self, message: Message) -> bool {
        if !message.is_data() {
            trace!(kind = ?message.kind, channel = %message.channel, "Skipping control message");
            self.stats.record_control_skipped();
            return false;
        }

        let Some(handler) = self.router.read().lookup(&message.channel) else {
            warn!(channel = %message.channel, "No handler for subscribed channel");
            self.stats.record_unrouted();
            return false;
        };

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let handle = tokio::spawn(run_handler(
            handler,
            message.channel.clone(),
            message.payload,
            sequence,
            self.stats.clone(),
        ));

        let evicted = self
            .tasks
            .lock()
            .push(TrackedTask::new(sequence, message.channel, handle));
        if let Some(evicted) = evicted {
            trace!(
                sequence = evicted.sequence,
                finished = evicted.is_finished(),
                "Evicted oldest tracked handler task"
            );
        }

        self.stats.record_dispatched();
        true
    }
}

async fn run_handler(
    handler: HandlerRef,
    channel: String,
    payload: String,
    sequence: u64,
    stats: Arc<DispatchStats>,
) {
    if let Err(e) = handler.handle(payload).await {
        stats.record_handler_failure();
        warn!(
            channel = %channel,
            sequence,
            error = %e,
            "PubSub handler failed"
        );
    }
}
