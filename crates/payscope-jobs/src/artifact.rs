use payscope_core::error::PayScopeError;
use payscope_core::model::{Artifact, FileFormat};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

fn dependency_error(detail: impl Into<String>) -> PayScopeError {
    PayScopeError::DependencyUnavailable {
        dependency: "job_queue".to_string(),
        detail: detail.into(),
    }
}

fn parse_file_format(raw: &str) -> Result<FileFormat, PayScopeError> {
    match raw {
        "pdf-digital" => Ok(FileFormat::PdfDigital),
        "pdf-scanned" => Ok(FileFormat::PdfScanned),
        "csv" => Ok(FileFormat::Csv),
        "xlsx" => Ok(FileFormat::Xlsx),
        other => Err(PayScopeError::Internal {
            detail: format!("unrecognized file_format in artifacts row: {other}"),
        }),
    }
}

fn artifact_from_row(row: &PgRow) -> Result<Artifact, PayScopeError> {
    let file_format_raw: String = row.try_get("file_format").map_err(|e| dependency_error(e.to_string()))?;
    Ok(Artifact {
        artifact_id: row.try_get("artifact_id").map_err(|e| dependency_error(e.to_string()))?,
        bank_id: row.try_get("bank_id").map_err(|e| dependency_error(e.to_string()))?,
        object_key: row.try_get("object_key").map_err(|e| dependency_error(e.to_string()))?,
        file_format: parse_file_format(&file_format_raw)?,
        sha256: row.try_get("sha256").map_err(|e| dependency_error(e.to_string()))?,
        upload_time: row.try_get("upload_time").map_err(|e| dependency_error(e.to_string()))?,
    })
}

/// Loads the immutable `Artifact` row a `ParseJob` points at. `apps/pipeline-worker`
/// calls this right after claiming a job, before touching the object store.
pub async fn fetch_artifact(pool: &PgPool, artifact_id: Uuid) -> Result<Artifact, PayScopeError> {
    let row = sqlx::query(
        "SELECT artifact_id, bank_id, object_key, file_format, sha256, upload_time
         FROM artifacts WHERE artifact_id = $1",
    )
    .bind(artifact_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| dependency_error(format!("fetch_artifact {artifact_id}: {e}")))?
    .ok_or_else(|| PayScopeError::Internal {
        detail: format!("artifact {artifact_id} referenced by job but not found"),
    })?;
    artifact_from_row(&row)
}
