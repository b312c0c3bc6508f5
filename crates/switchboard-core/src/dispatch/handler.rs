//! Handler trait definitions

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Unit of work bound to a channel
///
/// Invoked once per inbound message on its channel, inside its own tokio task.
/// The returned result is only logged; the dispatcher never retries.
///
/// Any `Fn(String) -> impl Future<Output = anyhow::Result<()>>` closure is a
/// handler:
///
/// ```ignore
/// router.register("alerts", |payload: String| async move {
///     notify(&payload).await?;
///     anyhow::Ok(())
/// });
/// ```
#[async_trait]
pub trait PubSubHandler: Send + Sync + 'static {
    async fn handle(&self, payload: String) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> PubSubHandler for F
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(&self, payload: String) -> anyhow::Result<()> {
        (self)(payload).await
    }
}

/// Shared reference to a registered handler
pub type HandlerRef = Arc<dyn PubSubHandler>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PubSubHandler for CountingHandler {
        async fn handle(&self, _payload: String) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_closure_handler() {
        let handler: HandlerRef = Arc::new(|payload: String| async move {
            anyhow::ensure!(payload == "ok", "unexpected payload {payload}");
            anyhow::Ok(())
        });

        assert!(handler.handle("ok".to_string()).await.is_ok());
        assert!(handler.handle("nope".to_string()).await.is_err());
    }

    #[tokio::test]
    async fn test_struct_handler() {
        let handler = Arc::new(CountingHandler {
            calls: AtomicUsize::new(0),
        });
        let shared: HandlerRef = handler.clone();

        shared.handle("a".to_string()).await.unwrap();
        shared.handle("b".to_string()).await.unwrap();

        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
    }
}
