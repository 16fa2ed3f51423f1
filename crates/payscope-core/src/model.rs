use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current schema version stamped on every canonical row and audit event.
/// Bump when the canonical shape changes in a way consumers must know about.
pub const CURRENT_SCHEMA_VERSION: &str = "1.0";

fn parse_semver_like(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.splitn(2, '.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().unwrap_or("0").parse().ok()?;
    Some((major, minor))
}

/// Guards against ingesting a record stamped with a `schema_version` newer
/// than this process understands (spec.md §3.1 SUPPLEMENT): rather than
/// guessing at a migration, the caller routes the record to the DLQ with
/// `error_class = "schema_violation"`. An unparseable version string is
/// treated the same way a newer one would be, since a process that can't
/// even read the version number can't promise it understands the record.
pub fn check_schema_compatibility(found: &str) -> Result<(), crate::error::PayScopeError> {
    let current = parse_semver_like(CURRENT_SCHEMA_VERSION).expect("CURRENT_SCHEMA_VERSION is well-formed");
    let is_compatible = parse_semver_like(found).is_some_and(|v| v <= current);
    if is_compatible {
        Ok(())
    } else {
        Err(crate::error::PayScopeError::SchemaViolation {
            found: found.to_string(),
            current: CURRENT_SCHEMA_VERSION.to_string(),
        })
    }
}

#[cfg(test)]
mod schema_compatibility_tests {
    use super::*;

    #[test]
    fn current_version_is_compatible() {
        assert!(check_schema_compatibility(CURRENT_SCHEMA_VERSION).is_ok());
    }

    #[test]
    fn older_minor_version_is_compatible() {
        assert!(check_schema_compatibility("0.9").is_ok());
    }

    #[test]
    fn newer_version_is_a_schema_violation() {
        let err = check_schema_compatibility("2.0").unwrap_err();
        assert_eq!(err.error_class(), "schema_violation");
    }

    #[test]
    fn unparseable_version_is_a_schema_violation() {
        assert!(check_schema_compatibility("not-a-version").is_err());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileFormat {
    PdfDigital,
    PdfScanned,
    Csv,
    Xlsx,
}

/// Immutable raw upload. Created at upload time, never mutated; destroyed
/// only by the retention sweep in `apps/outbox-drainer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub artifact_id: Uuid,
    pub bank_id: Uuid,
    pub object_key: String,
    pub file_format: FileFormat,
    pub sha256: String,
    pub upload_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Dlq,
}

impl JobStatus {
    /// SUCCEEDED and DLQ are the only terminal states; callers use this to
    /// guard against claiming or retrying a job that's already done.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Dlq)
    }
}

/// Unit of processing for one artifact. Transitions only forward through
/// the pipeline; `payscope-jobs` is the sole writer of this row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseJob {
    pub job_id: Uuid,
    pub artifact_id: Uuid,
    pub status: JobStatus,
    pub attempt_count: i32,
    pub last_error: Option<String>,
    pub claim_token: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Text,
    Table,
    Line,
    Cell,
}

/// Axis-aligned bounding box in page coordinates, `(x0, y0, x1, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

/// Back-reference from an extracted element to the artifact and location
/// it was read from (page number, or sheet name + row for tabular sources).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub artifact_id: Uuid,
    pub object_key: String,
    pub row_or_page: i64,
    pub sheet_name: Option<String>,
}

/// One element of an `IntermediateDocument`: a span of text with its layout
/// position and, for OCR'd or tabular sources, a confidence score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentElement {
    pub page: i32,
    pub element_type: ElementType,
    pub text: String,
    pub bbox: Option<BoundingBox>,
    pub ocr_confidence: Option<f64>,
    pub source_ref: SourceRef,
}

/// Per-page ordered sequence of elements produced by the extractor (C3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntermediateDocument {
    pub artifact_id: Uuid,
    pub elements: Vec<DocumentElement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldTag {
    Amount,
    Currency,
    TransactionId,
    Date,
    Status,
    None,
}

impl FieldTag {
    /// Deterministic tie-break order used when two candidate tags score
    /// within the tagger's epsilon; lower index wins.
    pub const TIE_BREAK_ORDER: [FieldTag; 5] = [
        FieldTag::TransactionId,
        FieldTag::Date,
        FieldTag::Amount,
        FieldTag::Currency,
        FieldTag::Status,
    ];

    pub fn tie_break_rank(self) -> usize {
        Self::TIE_BREAK_ORDER
            .iter()
            .position(|t| *t == self)
            .unwrap_or(Self::TIE_BREAK_ORDER.len())
    }
}

/// An `IntermediateDocument` element plus the field tag assigned to it by
/// the layout tagger (C4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutTaggedElement {
    pub element: DocumentElement,
    pub field_tag: FieldTag,
    pub tag_confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStage {
    Auth,
    Clearing,
    Settlement,
}

impl LifecycleStage {
    /// Forward order of the payment lifecycle; used to reject out-of-order
    /// graph transitions (e.g. SETTLED before AUTHORIZED) in the persister.
    pub fn ordinal(self) -> u8 {
        match self {
            LifecycleStage::Auth => 0,
            LifecycleStage::Clearing => 1,
            LifecycleStage::Settlement => 2,
        }
    }
}

/// Where a row's canonical mapping came from: the model, or the rule-based
/// fallback used when the model is unavailable (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingSource {
    Model,
    Rule,
}

/// Identifies the artifact location a canonical transaction was derived
/// from, carried forward for audit and reprocessing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSourceRef {
    pub artifact_id: Uuid,
    pub object_key: String,
    pub row_or_page: i64,
}

/// A normalized payment transaction (TransactionFact). The unit of
/// persistence fanned out across all four canonical stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalTransaction {
    pub transaction_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub timestamp_utc: DateTime<Utc>,
    pub lifecycle_stage: LifecycleStage,
    pub merchant_id: String,
    pub card_network: String,
    pub bank_id: Uuid,
    pub raw_source_ref: RawSourceRef,
    pub confidence_score: f64,
    pub schema_version: String,
    pub mapping_source: MappingSource,
}

impl CanonicalTransaction {
    /// The `(bank_id, transaction_id, lifecycle_stage, schema_version)`
    /// tuple that invariant 2 requires to be globally unique.
    pub fn dedupe_key(&self) -> (Uuid, String, LifecycleStage, String) {
        (
            self.bank_id,
            self.transaction_id.clone(),
            self.lifecycle_stage,
            self.schema_version.clone(),
        )
    }
}

/// A batch of transactions ingested from one artifact (ReportFact).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalReport {
    pub report_id: Uuid,
    pub report_type: String,
    pub ingestion_time: DateTime<Utc>,
    pub source_network: String,
    pub record_count: i64,
    pub schema_version: String,
    pub bank_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Ingest,
    AgentDecision,
    Forecast,
}

/// Append-only ledger entry. `artifact_hash` is the sha256 of the
/// canonical JSON encoding of whatever payload the event attests to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub event_type: EventType,
    pub artifact_hash: String,
    pub schema_version: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    /// Field validation from `spec.md` §4.10: hash shape, non-empty schema
    /// version. UUID and RFC-3339 shape are enforced by the field types
    /// themselves once deserialized.
    pub fn is_well_formed(&self) -> bool {
        crate::canonical_json::is_valid_sha256_hex(&self.artifact_hash) && !self.schema_version.is_empty()
    }
}

/// Off-chain companion row recorded alongside an audit event so an auditor
/// can recompute the hash from source data (spec.md §4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditCompanion {
    pub model_version: Option<String>,
    pub prompt_version: Option<String>,
    pub schema_version: String,
    pub input_hash: String,
    pub output_hash: String,
    pub confidence: f64,
    pub ledger_event_id: Uuid,
    pub bank_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_stage_ordinals_are_monotone() {
        assert!(LifecycleStage::Auth.ordinal() < LifecycleStage::Clearing.ordinal());
        assert!(LifecycleStage::Clearing.ordinal() < LifecycleStage::Settlement.ordinal());
    }

    #[test]
    fn field_tag_tie_break_prefers_transaction_id() {
        assert_eq!(FieldTag::TransactionId.tie_break_rank(), 0);
        assert!(FieldTag::TransactionId.tie_break_rank() < FieldTag::Date.tie_break_rank());
        assert!(FieldTag::Date.tie_break_rank() < FieldTag::Amount.tie_break_rank());
    }

    #[test]
    fn job_status_terminal_states() {
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Dlq.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
    }
}
