use chrono::{DateTime, Utc};
use payscope_core::error::PayScopeError;
use sqlx::{PgPool, Row};
use uuid::Uuid;

fn dependency_error(detail: impl Into<String>) -> PayScopeError {
    PayScopeError::DependencyUnavailable {
        dependency: "job_queue".to_string(),
        detail: detail.into(),
    }
}

/// Artifacts older than `cutoff` and not referenced by a still-pending or
/// running job (spec.md §3.2's retention sweep only ever touches
/// terminal-state artifacts).
pub async fn artifacts_older_than(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<Vec<(Uuid, String)>, PayScopeError> {
    let rows = sqlx::query(
        "SELECT a.artifact_id, a.object_key FROM artifacts a
         WHERE a.upload_time < $1
         AND NOT EXISTS (
             SELECT 1 FROM parse_jobs j
             WHERE j.artifact_id = a.artifact_id AND j.status IN ('PENDING', 'RUNNING')
         )",
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await
    .map_err(|e| dependency_error(format!("artifacts_older_than: {e}")))?;

    rows.into_iter()
        .map(|row| {
            let artifact_id: Uuid = row.try_get("artifact_id").map_err(|e| dependency_error(e.to_string()))?;
            let object_key: String = row.try_get("object_key").map_err(|e| dependency_error(e.to_string()))?;
            Ok((artifact_id, object_key))
        })
        .collect()
}

/// Deletes an artifact's row once its object has been removed from the
/// store. Deliberately takes only `artifact_id`: the caller is
/// responsible for having already deleted the object bytes, so this is
/// the metadata half of one retention-sweep unit of work.
pub async fn delete_artifact_row(pool: &PgPool, artifact_id: Uuid) -> Result<(), PayScopeError> {
    sqlx::query("DELETE FROM artifacts WHERE artifact_id = $1")
        .bind(artifact_id)
        .execute(pool)
        .await
        .map_err(|e| dependency_error(format!("delete_artifact_row {artifact_id}: {e}")))?;
    Ok(())
}
