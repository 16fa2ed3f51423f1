//! API surface (C13): the HTTP front door for upload intake, the chat/query
//! RAG endpoint, health probes, metrics, and the admin dataset-validation
//! endpoint (spec.md §4.13 / §6).

mod error;
mod handlers;
mod middleware;
mod routes;
mod state;

use payscope_core::config::PayScopeConfig;
use state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = PayScopeConfig::from_env().unwrap_or_else(|e| {
        eprintln!("configuration error: {e}");
        std::process::exit(2);
    });

    payscope_telemetry::init_tracing("api-gateway", config.env != "development");

    let port = config.port;
    let state = AppState::build(config).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to initialize dependencies");
        std::process::exit(3);
    });

    let app = routes::build(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to bind listener");
            std::process::exit(3);
        });

    tracing::info!(port, "api-gateway listening");
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server exited with error");
        std::process::exit(1);
    }
}
