use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use switchboard_core::services::ServiceError;
use tracing::debug;

/// Envelope of every v1 response
#[derive(Serialize, Debug)]
pub struct BaseResponse<T: Serialize> {
    pub status: u16,
    pub data: T,
}

pub fn create<T: Serialize>(data: T, status: StatusCode) -> Response {
    let body = BaseResponse {
        status: status.as_u16(),
        data,
    };
    (status, Json(body)).into_response()
}

pub fn ok<T: Serialize>(data: T) -> Response {
    create(data, StatusCode::OK)
}

/// Answer with the resolved error name as data
pub fn service_error<E: ServiceError>(error: &E) -> Response {
    let status = StatusCode::from_u16(error.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    debug!(
        error = %error.resolve_name(),
        status_code = status.as_u16(),
        "API call was interrupted by a service error"
    );
    create(error.resolve_name(), status)
}

/// Unwrap a service result into either its value or an error response
pub fn unwrap<T, E: ServiceError>(result: Result<T, E>) -> Result<T, Response> {
    result.map_err(|error| service_error(&error))
}
