use axum::response::IntoResponse;

/// `GET /metrics` (spec.md §6): Prometheus text exposition format.
pub async fn metrics() -> impl IntoResponse {
    (
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        payscope_telemetry::METRICS.encode(),
    )
}
