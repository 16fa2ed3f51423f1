use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use payscope_core::error::PayScopeError;
use payscope_telemetry::METRICS;
use serde_json::json;

/// Wraps `PayScopeError` so it can be returned directly from a handler;
/// the status mapping follows spec.md §7's propagation policy.
pub struct ApiError(PayScopeError);

impl From<PayScopeError> for ApiError {
    fn from(e: PayScopeError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PayScopeError::AuthError { .. } => StatusCode::UNAUTHORIZED,
            PayScopeError::TenantMismatch { .. } => StatusCode::FORBIDDEN,
            PayScopeError::TenantNotBound => StatusCode::INTERNAL_SERVER_ERROR,
            PayScopeError::IngestionOverloaded => StatusCode::SERVICE_UNAVAILABLE,
            PayScopeError::ValidationRowFailed { .. } | PayScopeError::SchemaViolation { .. } => StatusCode::BAD_REQUEST,
            PayScopeError::DependencyUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            PayScopeError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            PayScopeError::ExtractionFailed { .. }
            | PayScopeError::MappingLowConfidence { .. }
            | PayScopeError::PersistenceConflict { .. }
            | PayScopeError::IdempotencyViolation { .. }
            | PayScopeError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        METRICS.errors_total.with_label_values(&[self.0.error_class()]).inc();
        tracing::error!(error_class = self.0.error_class(), detail = %self.0, "request failed");

        (status, Json(json!({ "error": self.0.error_class(), "detail": self.0.to_string() }))).into_response()
    }
}
