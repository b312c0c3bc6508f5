use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use super::{ServiceContext, ServiceError};
use crate::dispatch::DispatchStatsSnapshot;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HealthError {
    #[error("service is unhealthy: {0}")]
    ServiceUnhealthy(String),
}

impl ServiceError for HealthError {
    fn service(&self) -> &'static str {
        "health"
    }

    fn code(&self) -> &'static str {
        match self {
            Self::ServiceUnhealthy(_) => "service_unhealthy",
        }
    }

    fn status_code(&self) -> u16 {
        503
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthReport {
    pub pubsub_backend: String,
    pub pubsub_listening: bool,
    pub channels: Vec<String>,
    pub tracked_tasks: usize,
    pub running_tasks: usize,
    pub stats: DispatchStatsSnapshot,
}

/// Report the state of the pub/sub client.
///
/// Unhealthy when the listener was started but is no longer running. A client
/// without routes never starts a listener and is healthy.
pub async fn check_health(ctx: &ServiceContext) -> Result<HealthReport, HealthError> {
    let pubsub = ctx.pubsub();
    let listening = pubsub.is_listening();

    if pubsub.is_initialised() && !listening {
        warn!("PubSub listener is not running");
        return Err(HealthError::ServiceUnhealthy(
            "pubsub listener is not running".to_string(),
        ));
    }

    Ok(HealthReport {
        pubsub_backend: pubsub.connector().name().to_string(),
        pubsub_listening: listening,
        channels: pubsub.channels(),
        tracked_tasks: pubsub.tracked_tasks(),
        running_tasks: pubsub.running_tasks(),
        stats: pubsub.stats(),
    })
}
