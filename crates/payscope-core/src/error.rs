use uuid::Uuid;

/// Bank-agnostic error taxonomy from the failure semantics summary.
///
/// Each variant maps to exactly one of the three propagation policies:
/// retried transparently, surfaced to the job record, or surfaced to the
/// caller. `apps/api-gateway` maps these to HTTP status codes;
/// `payscope-jobs` maps them to a retryable/non-retryable classification.
#[derive(Debug, thiserror::Error)]
pub enum PayScopeError {
    #[error("authentication failed: {reason}")]
    AuthError { reason: String },

    #[error("tenant mismatch: token bank_id {token_bank_id} != header bank_id {header_bank_id}")]
    TenantMismatch {
        token_bank_id: Uuid,
        header_bank_id: Uuid,
    },

    #[error("tenant_not_bound: data access attempted without a bound tenant context")]
    TenantNotBound,

    #[error("ingestion_overloaded: queue depth above high watermark")]
    IngestionOverloaded,

    #[error("extraction_failed: {detail}")]
    ExtractionFailed { detail: String },

    #[error("mapping_low_confidence: lifecycle inference confidence {confidence} below threshold")]
    MappingLowConfidence { confidence: f64 },

    #[error("validation_row_failed: {detail}")]
    ValidationRowFailed { detail: String },

    #[error("persistence_conflict: {detail}")]
    PersistenceConflict { detail: String },

    #[error("schema_violation: record schema_version {found} is newer than this process's {current}")]
    SchemaViolation { found: String, current: String },

    #[error("idempotency_violation: event {event_id} payload hash mismatch")]
    IdempotencyViolation { event_id: Uuid },

    #[error("dependency_unavailable: {dependency}: {detail}")]
    DependencyUnavailable { dependency: String, detail: String },

    #[error("configuration error: {detail}")]
    Configuration { detail: String },

    #[error("internal error: {detail}")]
    Internal { detail: String },
}

impl PayScopeError {
    /// Whether the orchestrator should retry a stage that produced this
    /// error, per the failure semantics summary in `spec.md` §4 / §7.
    /// `extraction_failed` is deliberately excluded: spec.md §4.3 treats an
    /// unreadable file as fatal straight to DLQ, since the bytes a retry
    /// would re-read are exactly the ones that didn't parse the first time.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PayScopeError::DependencyUnavailable { .. })
    }

    /// The `error_class` recorded on a DLQ entry or structured log line.
    pub fn error_class(&self) -> &'static str {
        match self {
            PayScopeError::AuthError { .. } => "auth_error",
            PayScopeError::TenantMismatch { .. } => "tenant_mismatch",
            PayScopeError::TenantNotBound => "tenant_not_bound",
            PayScopeError::IngestionOverloaded => "ingestion_overloaded",
            PayScopeError::ExtractionFailed { .. } => "extraction_failed",
            PayScopeError::MappingLowConfidence { .. } => "mapping_low_confidence",
            PayScopeError::ValidationRowFailed { .. } => "validation_row_failed",
            PayScopeError::PersistenceConflict { .. } => "persistence_conflict",
            PayScopeError::SchemaViolation { .. } => "schema_violation",
            PayScopeError::IdempotencyViolation { .. } => "idempotency_violation",
            PayScopeError::DependencyUnavailable { .. } => "dependency_unavailable",
            PayScopeError::Configuration { .. } => "configuration_error",
            PayScopeError::Internal { .. } => "internal_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, PayScopeError>;
