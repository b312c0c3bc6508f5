use axum::{extract::State, response::Response};
use switchboard_core::services::health;

use super::AppState;
use super::response;

pub async fn health_check(State(state): State<AppState>) -> Response {
    match response::unwrap(health::check_health(&state.services).await) {
        Ok(report) => response::ok(report),
        Err(error_response) => error_response,
    }
}
