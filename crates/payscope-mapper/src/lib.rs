//! Semantic mapper (C5): LLM-assisted mapping from raw columns to the
//! canonical schema plus lifecycle inference, with confidence
//! thresholding and a deterministic rule-based fallback (spec.md §4.5).

pub mod model_call;
pub mod rule_fallback;
pub mod types;

use std::collections::HashMap;

use payscope_core::error::PayScopeError;
use payscope_core::model::MappingSource;
use tracing::{instrument, warn};

pub use model_call::MapperModelClient;
pub use types::{FieldMapping, MappingResponse};

/// `map(tagged_elements, sample_rows) -> MappingResponse` (spec.md §4.5).
/// `sample_rows` is the header-to-sample-values view the tagger already
/// builds for tabular sources; this crate does not re-derive it.
///
/// If `model_client` is absent, or the model call fails for any reason,
/// this falls back to the rule-based classifier and marks the result
/// `mapping_source = rule` so callers can distinguish a degraded response
/// from a model-backed one.
///
/// Confidence policy: per-field mappings below `confidence_threshold` are
/// dropped; a lifecycle inference below threshold is a non-retryable
/// `mapping_low_confidence` error rather than a dropped mapping, since the
/// whole artifact hangs off one lifecycle stage.
#[instrument(skip(sample_rows, model_client))]
pub async fn map(
    sample_rows: &HashMap<String, Vec<String>>,
    model_client: Option<&MapperModelClient>,
    confidence_threshold: f64,
) -> Result<MappingResponse, PayScopeError> {
    let mut response = match model_client {
        Some(client) => match client.map_fields(sample_rows).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "mapper model unavailable, falling back to rule-based classifier");
                rule_based_response(sample_rows)
            }
        },
        None => rule_based_response(sample_rows),
    };

    response.mappings.retain(|m| m.confidence >= confidence_threshold);

    if response.lifecycle_confidence < confidence_threshold {
        return Err(PayScopeError::MappingLowConfidence {
            confidence: response.lifecycle_confidence,
        });
    }

    Ok(response)
}

fn rule_based_response(sample_rows: &HashMap<String, Vec<String>>) -> MappingResponse {
    let (lifecycle, lifecycle_confidence) = rule_fallback::infer_lifecycle_by_rule(sample_rows);
    MappingResponse {
        lifecycle,
        lifecycle_confidence,
        mappings: rule_fallback::map_fields_by_rule(sample_rows),
        mapping_source: MappingSource::Rule,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rows() -> HashMap<String, Vec<String>> {
        let mut rows = HashMap::new();
        rows.insert("amount".to_string(), vec!["10.00".to_string(), "25.00".to_string()]);
        rows.insert("settlement_date".to_string(), vec!["2026-07-01".to_string()]);
        rows
    }

    #[tokio::test]
    async fn falls_back_to_rule_when_no_model_configured() {
        let response = map(&sample_rows(), None, 0.75).await.unwrap();
        assert_eq!(response.mapping_source, MappingSource::Rule);
    }

    #[tokio::test]
    async fn low_confidence_lifecycle_is_non_retryable_error() {
        let mut rows = HashMap::new();
        rows.insert("col_a".to_string(), vec!["x".to_string()]);
        let err = map(&rows, None, 0.75).await.unwrap_err();
        assert_eq!(err.error_class(), "mapping_low_confidence");
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn low_confidence_field_mappings_are_dropped_not_errored() {
        let mut rows = HashMap::new();
        rows.insert("settlement_date".to_string(), vec!["2026-07-01".to_string()]);
        rows.insert("mystery_column".to_string(), vec!["qqq".to_string()]);
        let response = map(&rows, None, 0.75).await.unwrap();
        assert!(response.mappings.iter().all(|m| m.confidence >= 0.75));
    }
}
