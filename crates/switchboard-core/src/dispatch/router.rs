//! PubSub Router - channel to handler registry
//!
//! Routers are plain values built during configuration and handed to a
//! `DispatchClient`. They can be namespaced with a prefix and merged.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use super::handler::{HandlerRef, PubSubHandler};

/// Registry mapping channel names to handlers
///
/// The prefix is applied once, when a route is registered. Merging copies
/// stored keys as they are, so a prefixed router keeps its namespace when it
/// is merged into an unprefixed one.
///
/// # Example
///
/// ```ignore
/// let mut router = PubSubRouter::with_prefix("billing.");
/// router.register("invoice", handle_invoice);
/// assert!(router.lookup("billing.invoice").is_some());
/// ```
#[derive(Clone, Default)]
pub struct PubSubRouter {
    routes: HashMap<String, HandlerRef>,
    prefix: String,
}

impl PubSubRouter {
    /// Create an unprefixed router
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a router whose channels are all namespaced by `prefix`
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            routes: HashMap::new(),
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Bind a handler to `prefix + channel`
    ///
    /// Registering the same final channel twice replaces the earlier handler.
    pub fn register<H: PubSubHandler>(&mut self, channel: &str, handler: H) {
        self.register_ref(channel, Arc::new(handler));
    }

    /// Same as `register` for an already shared handler
    pub fn register_ref(&mut self, channel: &str, handler: HandlerRef) {
        let channel_name = format!("{}{}", self.prefix, channel);
        self.routes.insert(channel_name, handler);
    }

    /// Copy every route of `other` into this router
    ///
    /// Colliding channels are overwritten by `other`'s handler and logged.
    /// Returns the number of overwritten routes.
    pub fn merge(&mut self, other: &PubSubRouter) -> usize {
        let mut overwritten = 0;
        for (channel, handler) in other.route_map() {
            if self.routes.contains_key(channel) {
                warn!(
                    channel = %channel,
                    "Overwritten route when merging PubSub routers"
                );
                overwritten += 1;
            }
            self.routes.insert(channel.clone(), handler.clone());
        }
        overwritten
    }

    /// True if no route is registered
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Read-only view of the current bindings
    pub fn route_map(&self) -> &HashMap<String, HandlerRef> {
        &self.routes
    }

    /// Registered channel names, sorted
    pub fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.routes.keys().cloned().collect();
        channels.sort();
        channels
    }

    /// Handler for an exact channel name
    pub fn lookup(&self, channel: &str) -> Option<HandlerRef> {
        self.routes.get(channel).cloned()
    }
}

impl fmt::Debug for PubSubRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PubSubRouter")
            .field("prefix", &self.prefix)
            .field("channels", &self.channels())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recording_handler(
        tag: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    ) -> impl PubSubHandler {
        move |payload: String| {
            let log = log.clone();
            async move {
                log.lock().push(format!("{tag}:{payload}"));
                anyhow::Ok(())
            }
        }
    }

    #[test]
    fn test_empty_router() {
        let router = PubSubRouter::new();
        assert!(router.is_empty());
        assert_eq!(router.len(), 0);
        assert!(router.lookup("anything").is_none());
    }

    #[test]
    fn test_register_applies_prefix() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut router = PubSubRouter::with_prefix("p.");
        router.register("c", recording_handler("c", log));

        assert_eq!(router.prefix(), "p.");
        assert_eq!(router.channels(), vec!["p.c".to_string()]);
        assert!(router.lookup("p.c").is_some());
        assert!(router.lookup("c").is_none());
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut router = PubSubRouter::new();
        router.register("x", recording_handler("first", log.clone()));
        router.register("x", recording_handler("second", log.clone()));

        assert_eq!(router.len(), 1);
        router
            .lookup("x")
            .unwrap()
            .handle("payload".to_string())
            .await
            .unwrap();
        assert_eq!(*log.lock(), vec!["second:payload".to_string()]);
    }

    #[tokio::test]
    async fn test_merge_overwrites_and_counts_collisions() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut a = PubSubRouter::new();
        a.register("x", recording_handler("a", log.clone()));
        a.register("only-a", recording_handler("a", log.clone()));

        let mut b = PubSubRouter::new();
        b.register("x", recording_handler("b", log.clone()));
        b.register("only-b", recording_handler("b", log.clone()));

        let overwritten = a.merge(&b);
        assert_eq!(overwritten, 1);
        assert_eq!(
            a.channels(),
            vec!["only-a".to_string(), "only-b".to_string(), "x".to_string()]
        );

        a.lookup("x").unwrap().handle("1".to_string()).await.unwrap();
        assert_eq!(*log.lock(), vec!["b:1".to_string()]);

        // The merged-in router is untouched.
        assert_eq!(b.channels(), vec!["only-b".to_string(), "x".to_string()]);
    }

    #[test]
    fn test_merge_keeps_prefixed_keys() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut prefixed = PubSubRouter::with_prefix("p.");
        prefixed.register("c", recording_handler("c", log.clone()));

        let mut root = PubSubRouter::with_prefix("root.");
        let overwritten = root.merge(&prefixed);

        assert_eq!(overwritten, 0);
        assert_eq!(root.channels(), vec!["p.c".to_string()]);
    }

    #[test]
    fn test_debug_lists_channels() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut router = PubSubRouter::with_prefix("n.");
        router.register("b", recording_handler("b", log.clone()));
        router.register("a", recording_handler("a", log));

        let debug = format!("{router:?}");
        assert!(debug.contains("\"n.a\", \"n.b\""));
    }
}
