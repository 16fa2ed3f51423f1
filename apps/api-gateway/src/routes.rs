use axum::extract::DefaultBodyLimit;
use axum::middleware as axum_middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, chat, health, metrics, upload};
use crate::middleware::{admin_guard, auth_guard};
use crate::state::AppState;

/// 100MB request body ceiling; multipart uploads larger than this are
/// rejected with 413 before `upload::upload` ever runs.
const MAX_BODY_BYTES: usize = 100 * 1024 * 1024;

pub fn build(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/admin/validate-datasets", get(admin::validate_datasets))
        .layer(axum_middleware::from_fn(admin_guard));

    let tenant_routes = Router::new()
        .route("/upload", post(upload::upload))
        .route("/chat/query", post(chat::chat_query))
        .merge(admin_routes)
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_guard))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    let public_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready))
        .route("/health/live", get(health::live))
        .route("/metrics", get(metrics::metrics));

    Router::new()
        .merge(tenant_routes)
        .merge(public_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
