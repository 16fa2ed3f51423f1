use payscope_core::model::{FieldTag, LifecycleStage, MappingSource};
use serde::{Deserialize, Serialize};

/// One raw-column-to-canonical-field mapping, with the confidence the
/// source (model or rule) assigned it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMapping {
    pub source_field: String,
    pub canonical_field: FieldTag,
    pub confidence: f64,
}

/// Result of `map()` (spec.md §4.5): the inferred lifecycle stage for the
/// whole artifact plus the per-field mappings that survived confidence
/// thresholding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingResponse {
    pub lifecycle: LifecycleStage,
    pub lifecycle_confidence: f64,
    pub mappings: Vec<FieldMapping>,
    pub mapping_source: MappingSource,
}
