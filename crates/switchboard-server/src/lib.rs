pub mod api;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod telemetry;
