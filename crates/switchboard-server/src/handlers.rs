//! Pub/sub handlers of the server process

use switchboard_core::PubSubRouter;
use tracing::info;

pub const SYSTEM_PREFIX: &str = "switchboard.";

async fn ping(payload: String) -> anyhow::Result<()> {
    info!(payload = %payload, "Received ping");
    Ok(())
}

/// Routes under the `switchboard.` namespace
pub fn system_router() -> PubSubRouter {
    let mut router = PubSubRouter::with_prefix(SYSTEM_PREFIX);
    router.register("ping", ping);
    router
}
