use std::time::Duration;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use payscope_core::error::PayScopeError;
use payscope_tenant::TenantContext;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Default lookback window when a query omits `time_range`: the trailing
/// 90 days, wide enough for the forecasting agent's weekly seasonal fit
/// to see several periods.
const DEFAULT_LOOKBACK_DAYS: i64 = 90;

const PER_AGENT_TIMEOUT_SECONDS: u64 = 20;

#[derive(Debug, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ChatQueryRequest {
    pub query: String,
    pub time_range: Option<TimeRange>,
}

/// `POST /chat/query` (spec.md §6 / §4.11): classify intent, retrieve
/// tenant-scoped evidence, dispatch the agents the intent routes to, and
/// compose their outputs into one structured response.
pub async fn chat_query(
    State(state): State<AppState>,
    Extension(ctx): Extension<TenantContext>,
    Json(body): Json<ChatQueryRequest>,
) -> impl IntoResponse {
    match handle(state, ctx, body).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

async fn handle(state: AppState, ctx: TenantContext, body: ChatQueryRequest) -> Result<payscope_rag::StructuredResponse, PayScopeError> {
    if body.query.trim().is_empty() {
        return Err(PayScopeError::ValidationRowFailed {
            detail: "query must not be empty".to_string(),
        });
    }

    let (from, to) = match body.time_range {
        Some(range) => (range.from, range.to),
        None => (Utc::now() - chrono::Duration::days(DEFAULT_LOOKBACK_DAYS), Utc::now()),
    };

    let classification = payscope_rag::classify_intent(&body.query, Some(state.intent_model.as_ref())).await;

    let evidence = payscope_rag::retrieve(
        ctx.bank_id,
        &body.query,
        from,
        to,
        &state.vector,
        &state.graph,
        &state.timeseries,
        &state.embedding_client,
    )
    .await;

    let task_id = Uuid::new_v4();
    let results = payscope_rag::dispatch(
        classification.intent,
        task_id,
        &body.query,
        &evidence,
        Duration::from_secs(PER_AGENT_TIMEOUT_SECONDS),
    )
    .await;

    let response = payscope_rag::compose(classification.intent, &evidence, &results);

    let intent_label = serde_json::to_value(response.intent).unwrap_or_default();
    let intent_label = intent_label.as_str().unwrap_or("UNKNOWN");
    payscope_telemetry::METRICS.chat_queries_total.with_label_values(&[intent_label]).inc();

    Ok(response)
}
