use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use switchboard_core::DispatchClient;
use switchboard_core::backends::MemoryBroker;
use switchboard_server::api::{AppState, create_app};
use switchboard_server::handlers::system_router;
use switchboard_server::middleware::REQUEST_ID_HEADER;
use tower::ServiceExt;

async fn listening_client() -> Arc<DispatchClient> {
    let client = Arc::new(DispatchClient::new(Arc::new(MemoryBroker::new())));
    client.include_router(&system_router()).unwrap();
    client.initialise().await.unwrap();
    client
}

async fn get(app: axum::Router, uri: &str, request_id: Option<&str>) -> (StatusCode, String, Value) {
    let mut builder = Request::builder().uri(uri);
    if let Some(request_id) = request_id {
        builder = builder.header(REQUEST_ID_HEADER, request_id);
    }
    let response = app
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let header = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, header, body)
}

#[tokio::test]
async fn health_reports_listening_client() {
    let client = listening_client().await;
    let app = create_app(AppState::new(client.clone()));

    let (status, request_id, body) = get(app, "/api/v1/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], 200);
    assert_eq!(body["data"]["pubsub_backend"], "memory");
    assert_eq!(body["data"]["pubsub_listening"], true);
    assert_eq!(body["data"]["channels"][0], "switchboard.ping");
    assert!(uuid::Uuid::parse_str(&request_id).is_ok());

    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn health_fails_after_shutdown() {
    let client = listening_client().await;
    client.shutdown().await.unwrap();
    let app = create_app(AppState::new(client));

    let (status, _, body) = get(app, "/api/v1/health", None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], 503);
    assert_eq!(body["data"], "health.service_unhealthy");
}

#[tokio::test]
async fn incoming_request_id_is_kept() {
    let client = listening_client().await;
    let app = create_app(AppState::new(client.clone()));

    let (_, request_id, _) = get(app, "/api/v1/health", Some("trace-123")).await;
    assert_eq!(request_id, "trace-123");

    client.shutdown().await.unwrap();
}
