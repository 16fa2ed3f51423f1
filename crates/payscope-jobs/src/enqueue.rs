use payscope_core::error::PayScopeError;
use payscope_core::model::{Artifact, FileFormat};
use sqlx::PgPool;
use uuid::Uuid;

fn dependency_error(detail: impl Into<String>) -> PayScopeError {
    PayScopeError::DependencyUnavailable {
        dependency: "job_queue".to_string(),
        detail: detail.into(),
    }
}

/// Persists the artifact row and its initial `PENDING` `ParseJob` in one
/// transaction: `POST /upload` (spec.md §6) must never leave an artifact
/// on disk without a job to process it, or a job pointed at an artifact
/// that was never recorded.
pub async fn enqueue_upload(pool: &PgPool, artifact: &Artifact) -> Result<Uuid, PayScopeError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| dependency_error(format!("begin enqueue transaction: {e}")))?;

    sqlx::query(
        "INSERT INTO artifacts (artifact_id, bank_id, object_key, file_format, sha256, upload_time)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(artifact.artifact_id)
    .bind(artifact.bank_id)
    .bind(&artifact.object_key)
    .bind(file_format_label(artifact.file_format))
    .bind(&artifact.sha256)
    .bind(artifact.upload_time)
    .execute(&mut *tx)
    .await
    .map_err(|e| dependency_error(format!("insert artifact {}: {e}", artifact.artifact_id)))?;

    let job_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO parse_jobs (job_id, artifact_id, status, attempt_count, last_error, claim_token, created_at)
         VALUES ($1, $2, 'PENDING', 0, NULL, NULL, now())",
    )
    .bind(job_id)
    .bind(artifact.artifact_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| dependency_error(format!("insert parse job for artifact {}: {e}", artifact.artifact_id)))?;

    tx.commit()
        .await
        .map_err(|e| dependency_error(format!("commit enqueue transaction: {e}")))?;
    Ok(job_id)
}

fn file_format_label(format: FileFormat) -> &'static str {
    match format {
        FileFormat::PdfDigital => "pdf-digital",
        FileFormat::PdfScanned => "pdf-scanned",
        FileFormat::Csv => "csv",
        FileFormat::Xlsx => "xlsx",
    }
}

/// Count of not-yet-terminal jobs, used by `POST /upload`'s backpressure
/// check (spec.md §5: "a high-watermark queue depth pauses API-side
/// acceptance of new uploads").
pub async fn pending_job_count(pool: &PgPool) -> Result<i64, PayScopeError> {
    sqlx::query_scalar("SELECT count(*) FROM parse_jobs WHERE status IN ('PENDING', 'RUNNING')")
        .fetch_one(pool)
        .await
        .map_err(|e| dependency_error(format!("pending_job_count: {e}")))
}
