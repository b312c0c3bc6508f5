pub mod health;
pub mod response;

use axum::{Router, middleware, routing::get};
use std::sync::Arc;
use switchboard_core::DispatchClient;
use switchboard_core::services::ServiceContext;

use crate::middleware::request_id_middleware;

/// Shared state of the HTTP application
#[derive(Clone)]
pub struct AppState {
    pub services: ServiceContext,
}

impl AppState {
    pub fn new(pubsub: Arc<DispatchClient>) -> Self {
        Self {
            services: ServiceContext::new(pubsub),
        }
    }
}

fn v1_routes() -> Router<AppState> {
    Router::new().route("/health", get(health::health_check))
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", v1_routes())
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
