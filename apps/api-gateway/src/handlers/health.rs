use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::state::AppState;

/// `GET /health` (spec.md §6): basic liveness, no dependency checks.
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// `GET /health/live` (spec.md §6): process-level liveness only — true as
/// soon as the binary is scheduled and serving, regardless of dependency
/// state. Distinct from `/health/ready`, which a load balancer should use
/// to decide whether to route traffic.
pub async fn live() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[derive(Serialize)]
struct DependencyStatus {
    facts: &'static str,
    ts: &'static str,
    graph: &'static str,
    vector: &'static str,
    object: &'static str,
    queue: &'static str,
}

fn status_of<T>(result: Result<T, payscope_core::error::PayScopeError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(_) => "error",
    }
}

/// `GET /health/ready` (spec.md §6): a per-dependency probe against each
/// of the four stores plus the object store and job queue. A probe that
/// is configured but unreachable reports `"error"`; none of these report
/// `"not_configured"` here since `AppState::build` fails startup rather
/// than constructing a handle for a dependency that was never configured.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let probe_bank_id = Uuid::nil();

    let facts = state.facts.transaction_count(probe_bank_id).await;
    let ts = state.timeseries.row_count(probe_bank_id).await;
    let graph = state.graph.node_count(probe_bank_id).await;
    let vector = state.vector.record_count(probe_bank_id).await;
    // A key-existence probe would confuse "never uploaded" with
    // "unreachable"; round-tripping a zero-byte write confirms the bucket
    // actually accepts writes instead.
    let object = state.objects.put("_health/probe", Vec::new()).await;
    let queue = payscope_jobs::pending_job_count(&state.db_pool).await;

    Json(DependencyStatus {
        facts: status_of(facts),
        ts: status_of(ts),
        graph: status_of(graph),
        vector: status_of(vector),
        object: status_of(object),
        queue: status_of(queue),
    })
}
