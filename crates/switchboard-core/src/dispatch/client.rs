//! Dispatch Client - owns the connector, the router and the listener task

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use switchboard_traits::{ConnectionResult, PubSubConnector};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::{DispatchError, Result};
use super::handler::PubSubHandler;
use super::listener::Listener;
use super::router::PubSubRouter;
use super::stats::{DispatchStats, DispatchStatsSnapshot};
use super::task_ring::{DEFAULT_TASK_CAPACITY, TaskRing};

/// Dispatch client configuration.
#[derive(Clone, Debug)]
pub struct DispatchConfig {
    /// Maximum number of handler tasks kept tracked.
    pub task_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            task_capacity: DEFAULT_TASK_CAPACITY,
        }
    }
}

struct ListenerHandle {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

enum ListenerState {
    Idle,
    Listening(ListenerHandle),
    Stopped,
}

/// Shared pub/sub client dispatching channel messages to handlers
///
/// Lifecycle: register routes while idle, call `initialise` once to start the
/// listener, call `shutdown` to stop it. Once the listener exists the routes
/// are frozen and every registration attempt fails with
/// `DispatchError::AlreadyListening`.
pub struct DispatchClient {
    connector: Arc<dyn PubSubConnector>,
    router: Arc<RwLock<PubSubRouter>>,
    tasks: Arc<Mutex<TaskRing>>,
    stats: Arc<DispatchStats>,
    listen_lock: Arc<tokio::sync::Mutex<()>>,
    state: Mutex<ListenerState>,
}

impl DispatchClient {
    pub fn new(connector: Arc<dyn PubSubConnector>) -> Self {
        Self::with_config(connector, DispatchConfig::default())
    }

    pub fn with_config(connector: Arc<dyn PubSubConnector>, config: DispatchConfig) -> Self {
        Self {
            connector,
            router: Arc::new(RwLock::new(PubSubRouter::new())),
            tasks: Arc::new(Mutex::new(TaskRing::new(config.task_capacity))),
            stats: Arc::new(DispatchStats::default()),
            listen_lock: Arc::new(tokio::sync::Mutex::new(())),
            state: Mutex::new(ListenerState::Idle),
        }
    }

    /// Register a handler for `channel`
    ///
    /// Must be called before `initialise`.
    pub fn register<H: PubSubHandler>(&self, channel: &str, handler: H) -> Result<()> {
        let state = self.state.lock();
        if !matches!(*state, ListenerState::Idle) {
            return Err(DispatchError::AlreadyListening);
        }
        self.router.write().register(channel, handler);
        Ok(())
    }

    /// Merge the routes of an externally built router
    ///
    /// Must be called before `initialise`.
    pub fn include_router(&self, router: &PubSubRouter) -> Result<()> {
        let state = self.state.lock();
        if !matches!(*state, ListenerState::Idle) {
            return Err(DispatchError::AlreadyListening);
        }
        let overwritten = self.router.write().merge(router);
        debug!(
            channels = router.len(),
            overwritten, "Included PubSub router"
        );
        Ok(())
    }

    /// Set up the connector and, if any route is registered, start the listener
    ///
    /// Returns once the listener has subscribed to every registered channel.
    /// Calling it again after the listener was created is an error. On any
    /// other failure the client is left idle and `initialise` may be retried.
    pub async fn initialise(&self) -> Result<()> {
        self.ensure_idle()?;
        self.connector.initialise().await?;

        if let Some(ready) = self.start_listener()? {
            let subscribed = match ready.await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(DispatchError::Connection(e)),
                Err(_) => Err(DispatchError::ListenerStopped),
            };
            if let Err(e) = subscribed {
                self.reset_listener().await;
                return Err(e);
            }
        }

        info!(
            backend = self.connector.name(),
            listening = self.is_initialised(),
            "PubSub client initialised"
        );
        Ok(())
    }

    fn ensure_idle(&self) -> Result<()> {
        if !matches!(*self.state.lock(), ListenerState::Idle) {
            return Err(DispatchError::AlreadyListening);
        }
        Ok(())
    }

    fn start_listener(&self) -> Result<Option<oneshot::Receiver<ConnectionResult<()>>>> {
        let mut state = self.state.lock();
        if !matches!(*state, ListenerState::Idle) {
            return Err(DispatchError::AlreadyListening);
        }

        if self.router.read().is_empty() {
            debug!("No PubSub routes registered, skipping listener");
            return Ok(None);
        }

        let (ready_tx, ready_rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let listener = Listener::new(
            self.connector.clone(),
            self.router.clone(),
            self.tasks.clone(),
            self.stats.clone(),
            self.listen_lock.clone(),
        );
        let handle = tokio::spawn(listener.run(cancel.clone(), ready_tx));

        *state = ListenerState::Listening(ListenerHandle { cancel, handle });
        Ok(Some(ready_rx))
    }

    /// Tear down a listener that failed to start and return to idle.
    ///
    /// A concurrent `shutdown` that already took the listener wins.
    async fn reset_listener(&self) {
        let listener = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, ListenerState::Idle) {
                ListenerState::Listening(listener) => Some(listener),
                other => {
                    *state = other;
                    None
                }
            }
        };

        if let Some(listener) = listener {
            listener.cancel.cancel();
            if let Err(e) = listener.handle.await {
                warn!(error = %e, "PubSub listener ended abnormally");
            }
        }
    }

    /// True once the listener task has been created
    pub fn is_initialised(&self) -> bool {
        !matches!(*self.state.lock(), ListenerState::Idle)
    }

    /// True while the listener task is alive
    pub fn is_listening(&self) -> bool {
        match &*self.state.lock() {
            ListenerState::Listening(listener) => !listener.handle.is_finished(),
            _ => false,
        }
    }

    /// Stop the listener and release the connector
    ///
    /// Handler tasks that are still running are left alone.
    pub async fn shutdown(&self) -> Result<()> {
        let listener = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, ListenerState::Stopped) {
                ListenerState::Listening(listener) => Some(listener),
                ListenerState::Idle => {
                    *state = ListenerState::Idle;
                    None
                }
                ListenerState::Stopped => None,
            }
        };

        if let Some(listener) = listener {
            listener.cancel.cancel();
            if let Err(e) = listener.handle.await {
                warn!(error = %e, "PubSub listener ended abnormally");
            }
        }

        self.connector.close().await?;
        info!(
            backend = self.connector.name(),
            "PubSub client shut down"
        );
        Ok(())
    }

    /// Publish through the underlying connector
    pub async fn publish(&self, channel: &str, payload: &str) -> Result<usize> {
        Ok(self.connector.publish(channel, payload).await?)
    }

    pub fn connector(&self) -> &Arc<dyn PubSubConnector> {
        &self.connector
    }

    /// Registered channel names, sorted
    pub fn channels(&self) -> Vec<String> {
        self.router.read().channels()
    }

    /// Number of handler tasks currently tracked
    pub fn tracked_tasks(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Number of tracked handler tasks that have not finished yet
    pub fn running_tasks(&self) -> usize {
        self.tasks.lock().running()
    }

    /// Dispatch sequence numbers of the tracked tasks, oldest first
    pub fn tracked_sequences(&self) -> Vec<u64> {
        self.tasks.lock().sequences()
    }

    pub fn stats(&self) -> DispatchStatsSnapshot {
        self.stats.snapshot()
    }

    #[cfg(test)]
    pub(crate) fn router(&self) -> &Arc<RwLock<PubSubRouter>> {
        &self.router
    }
}

impl Drop for DispatchClient {
    fn drop(&mut self) {
        if let ListenerState::Listening(listener) = &*self.state.lock() {
            listener.cancel.cancel();
        }
    }
}
