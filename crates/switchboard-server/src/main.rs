use std::sync::Arc;
use switchboard_core::backends::RedisConnector;
use switchboard_core::{DispatchClient, DispatchConfig};
use switchboard_server::api::{AppState, create_app};
use switchboard_server::config::ServerConfig;
use switchboard_server::{handlers, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let config = ServerConfig::load()?;
    tracing::info!(
        redis_host = %config.redis.host,
        redis_port = config.redis.port,
        "Starting Switchboard server"
    );

    let connector = Arc::new(RedisConnector::new(&config.redis)?);
    let pubsub = Arc::new(DispatchClient::with_config(
        connector,
        DispatchConfig {
            task_capacity: config.task_capacity,
        },
    ));
    pubsub.include_router(&handlers::system_router())?;
    pubsub.initialise().await?;
    tracing::info!("Connected to Redis");

    let app = create_app(AppState::new(pubsub.clone()));
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!("Switchboard running on http://{}", config.bind_address());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pubsub.shutdown().await?;
    tracing::info!("Disconnected from Redis");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
