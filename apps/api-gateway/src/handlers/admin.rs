use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ValidateDatasetsQuery {
    bank_id: uuid::Uuid,
}

/// `GET /admin/validate-datasets` (spec.md §4.15 / §6): admin-only (the
/// `admin_guard` middleware already rejected non-ADMIN callers), returns
/// the per-tenant row/node/vector counts an operator reconciles against
/// what was ingested.
pub async fn validate_datasets(State(state): State<AppState>, Query(q): Query<ValidateDatasetsQuery>) -> impl IntoResponse {
    match payscope_stores::validate::count_rows(&state.facts, &state.timeseries, &state.graph, &state.vector, q.bank_id).await {
        Ok(counts) => Json(counts).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
