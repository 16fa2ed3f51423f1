//! Per-job pipeline execution: extract -> tag -> sample rows -> map ->
//! build raw rows -> validate -> dedupe -> persist (spec.md §4.3-§4.8),
//! called once per claimed `ParseJob` by `main`'s claim loop.

use std::collections::HashMap;

use payscope_core::error::PayScopeError;
use payscope_core::model::{CanonicalReport, CanonicalTransaction, CURRENT_SCHEMA_VERSION};
use payscope_validate::RowError;
use tracing::{info, warn};
use uuid::Uuid;

use crate::rows;
use crate::state::WorkerState;

/// Namespace for deriving a `CanonicalReport.report_id` from the
/// artifact's content hash rather than generating one at random.
/// `payscope-persist` in turn derives `AuditEvent.event_id` from
/// `report_id`, so a byte-identical re-upload (spec.md §8 S2) must route
/// through the same `report_id` or the ledger's idempotency check would
/// never see the same event twice.
const REPORT_ID_NAMESPACE: Uuid = Uuid::from_bytes([
    0x50, 0x61, 0x79, 0x53, 0x63, 0x6f, 0x70, 0x65, 0x2d, 0x52, 0x65, 0x70, 0x6f, 0x72, 0x74, 0x21,
]);

fn report_id_for(bank_id: Uuid, sha256: &str) -> Uuid {
    Uuid::new_v5(&REPORT_ID_NAMESPACE, format!("{bank_id}:{sha256}").as_bytes())
}

fn most_common_network(transactions: &[CanonicalTransaction]) -> String {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for txn in transactions {
        *counts.entry(txn.card_network.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(network, _)| network.to_string())
        .unwrap_or_else(|| "UNKNOWN".to_string())
}

fn report_type_for(lifecycle: payscope_core::model::LifecycleStage) -> &'static str {
    use payscope_core::model::LifecycleStage::*;
    match lifecycle {
        Auth => "authorization_report",
        Clearing => "clearing_report",
        Settlement => "settlement_report",
    }
}

/// Runs the full pipeline for one claimed job. Never propagates an error:
/// every failure is resolved into a retry/DLQ/success state transition on
/// the job row itself, since the caller's only job is to claim the next
/// one.
pub async fn run_job(state: &WorkerState, job: payscope_core::model::ParseJob) {
    let outcome = process(state, &job).await;
    match outcome {
        Ok(summary) => {
            if let Err(e) = payscope_jobs::mark_succeeded(&state.db_pool, job.job_id).await {
                warn!(error = %e, job_id = %job.job_id, "failed to mark job succeeded");
            } else {
                info!(job_id = %job.job_id, records = summary.record_count, row_errors = summary.row_error_count, "job succeeded");
            }
        }
        Err(e) => handle_failure(state, &job, e).await,
    }
}

struct IngestSummary {
    record_count: i64,
    row_error_count: usize,
}

async fn handle_failure(state: &WorkerState, job: &payscope_core::model::ParseJob, error: PayScopeError) {
    let retryable = error.is_retryable();
    let exhausted = state.retry_policy.exhausted(job.attempt_count as u32);

    if retryable && !exhausted {
        warn!(job_id = %job.job_id, error = %error, attempt = job.attempt_count, "stage failed, returning to queue for retry");
        if let Err(e) = payscope_jobs::mark_retry(&state.db_pool, job.job_id, &error.to_string()).await {
            warn!(error = %e, job_id = %job.job_id, "failed to mark job for retry");
        }
        return;
    }

    warn!(job_id = %job.job_id, error = %error, error_class = error.error_class(), "job moved to DLQ");
    if let Err(e) = payscope_jobs::move_to_dlq(
        &state.db_pool,
        job.job_id,
        error.error_class(),
        &error.to_string(),
        &format!("artifact:{}", job.artifact_id),
    )
    .await
    {
        warn!(error = %e, job_id = %job.job_id, "failed to move job to DLQ");
    }
}

async fn process(state: &WorkerState, job: &payscope_core::model::ParseJob) -> Result<IngestSummary, PayScopeError> {
    let artifact = payscope_jobs::fetch_artifact(&state.db_pool, job.artifact_id).await?;

    let bytes = state.objects.get(&artifact.object_key).await?;

    let document = payscope_extract::extract(artifact.artifact_id, &artifact.object_key, artifact.file_format, &bytes, &[], None)?;

    let tabular_view = rows::synthesize_tabular_view(&document);
    let sample_rows = rows::build_sample_rows(&tabular_view);

    let mapping = payscope_mapper::map(&sample_rows, Some(&state.mapper_model), state.config.mapping_confidence_threshold).await?;

    if mapping.mapping_source == payscope_core::model::MappingSource::Model {
        record_mapping_companion(state, &artifact, &sample_rows, &mapping).await;
    }

    let raw_rows = rows::build_raw_rows(
        &tabular_view,
        &artifact.object_key,
        &mapping,
        artifact.bank_id,
        "UNKNOWN",
        CURRENT_SCHEMA_VERSION,
    );

    let mut transactions = Vec::with_capacity(raw_rows.len());
    let mut row_errors: Vec<RowError> = Vec::new();
    for raw in raw_rows {
        match payscope_validate::validate_row(&raw) {
            Ok(canonical) => transactions.push(canonical),
            Err(row_error) => row_errors.push(row_error),
        }
    }
    for row_error in &row_errors {
        warn!(job_id = %job.job_id, row = row_error.row_or_page, field = %row_error.field, detail = %row_error.detail, "row failed validation, dropped from canonical report");
    }

    let transactions = payscope_validate::dedupe(transactions);
    let record_count = transactions.len() as i64;

    let report = CanonicalReport {
        report_id: report_id_for(artifact.bank_id, &artifact.sha256),
        report_type: report_type_for(mapping.lifecycle).to_string(),
        ingestion_time: chrono::Utc::now(),
        source_network: most_common_network(&transactions),
        record_count,
        schema_version: CURRENT_SCHEMA_VERSION.to_string(),
        bank_id: artifact.bank_id,
    };

    payscope_persist::persist_ingest(artifact.bank_id, &report, &transactions, &state.facts, &state.audit).await?;

    Ok(IngestSummary {
        record_count,
        row_error_count: row_errors.len(),
    })
}

/// Records an off-chain `AuditCompanion` row for a model-assisted mapping
/// decision, so a later audit can recompute the input/output hash and
/// compare it against the ledger entry the ingest event attests to
/// (spec.md §4.10). Best-effort: a companion write failing never fails
/// the job, since the job's own outcome does not depend on this record
/// existing.
async fn record_mapping_companion(
    state: &WorkerState,
    artifact: &payscope_core::model::Artifact,
    sample_rows: &HashMap<String, Vec<String>>,
    mapping: &payscope_mapper::MappingResponse,
) {
    let input_hash = match payscope_core::canonical_json::hash(sample_rows) {
        Ok(h) => h,
        Err(e) => {
            warn!(error = %e, artifact_id = %artifact.artifact_id, "failed to hash mapper input for companion row");
            return;
        }
    };
    let output_hash = match payscope_core::canonical_json::hash(mapping) {
        Ok(h) => h,
        Err(e) => {
            warn!(error = %e, artifact_id = %artifact.artifact_id, "failed to hash mapper output for companion row");
            return;
        }
    };

    let companion = payscope_core::model::AuditCompanion {
        model_version: Some(state.config.llm_model.clone()),
        prompt_version: None,
        schema_version: CURRENT_SCHEMA_VERSION.to_string(),
        input_hash,
        output_hash,
        confidence: mapping.lifecycle_confidence,
        ledger_event_id: report_id_for(artifact.bank_id, &artifact.sha256),
        bank_id: artifact.bank_id,
    };
    if let Err(e) = payscope_audit::companion::record_companion(&state.http_client, &state.audit_ledger_endpoint, &companion).await {
        warn!(error = %e, artifact_id = %artifact.artifact_id, "failed to record mapping companion row");
    }
}
