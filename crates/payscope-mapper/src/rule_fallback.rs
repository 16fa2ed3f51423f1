use std::collections::HashMap;

use payscope_core::model::{FieldTag, LifecycleStage};
use payscope_tagger::value_profile::infer_column_tag;

use crate::types::FieldMapping;

/// Rule-based mapper used when the model is unavailable (spec.md §4.5).
/// Reuses the layout tagger's header-match prior rather than duplicating
/// it, since both are scoring the same "does this header/value look like
/// this field" question.
pub fn map_fields_by_rule(sample_rows: &HashMap<String, Vec<String>>) -> Vec<FieldMapping> {
    sample_rows
        .iter()
        .map(|(header, values)| {
            let sample: Vec<&str> = values.iter().map(String::as_str).take(50).collect();
            let (canonical_field, confidence) = infer_column_tag(header, &sample);
            FieldMapping {
                source_field: header.clone(),
                canonical_field,
                confidence,
            }
        })
        .collect()
}

/// Infers the lifecycle stage by keyword presence in header names. A
/// conservative fallback: without a model, we trust explicit vocabulary
/// ("authorization", "clearing", "settlement") over statistical inference.
pub fn infer_lifecycle_by_rule(sample_rows: &HashMap<String, Vec<String>>) -> (LifecycleStage, f64) {
    let joined_headers: String = sample_rows.keys().cloned().collect::<Vec<_>>().join(" ").to_lowercase();

    if joined_headers.contains("settle") {
        (LifecycleStage::Settlement, 0.8)
    } else if joined_headers.contains("clear") {
        (LifecycleStage::Clearing, 0.8)
    } else if joined_headers.contains("auth") {
        (LifecycleStage::Auth, 0.8)
    } else {
        (LifecycleStage::Auth, 0.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_settlement_from_header_vocabulary() {
        let mut rows = HashMap::new();
        rows.insert("settlement_date".to_string(), vec!["2026-07-01".to_string()]);
        let (stage, confidence) = infer_lifecycle_by_rule(&rows);
        assert_eq!(stage, LifecycleStage::Settlement);
        assert!(confidence > 0.5);
    }

    #[test]
    fn maps_amount_column_via_shared_tagger_logic() {
        let mut rows = HashMap::new();
        rows.insert("amount".to_string(), vec!["10.00".to_string(), "25.50".to_string()]);
        let mappings = map_fields_by_rule(&rows);
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].canonical_field, FieldTag::Amount);
    }
}
