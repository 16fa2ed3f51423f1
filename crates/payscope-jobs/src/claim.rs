use chrono::{DateTime, Duration as ChronoDuration, Utc};
use payscope_core::error::PayScopeError;
use payscope_core::model::{JobStatus, ParseJob};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

/// One `dlq_entries` row, for `apps/payscope-cli`'s DLQ listing.
#[derive(Debug, Clone)]
pub struct DlqEntry {
    pub dlq_id: Uuid,
    pub job_id: Uuid,
    pub error_class: String,
    pub error_detail: String,
    pub payload_ref: String,
    pub created_at: DateTime<Utc>,
}

impl FromRow<'_, PgRow> for DlqEntry {
    fn from_row(row: &PgRow) -> sqlx::Result<Self> {
        Ok(DlqEntry {
            dlq_id: row.try_get("dlq_id")?,
            job_id: row.try_get("job_id")?,
            error_class: row.try_get("error_class")?,
            error_detail: row.try_get("error_detail")?,
            payload_ref: row.try_get("payload_ref")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

fn dependency_error(detail: impl Into<String>) -> PayScopeError {
    PayScopeError::DependencyUnavailable {
        dependency: "job_queue".to_string(),
        detail: detail.into(),
    }
}

/// `ParseJob` lives in `payscope-core` and `sqlx::FromRow` in `sqlx`, so
/// orphan rules rule out implementing the trait here; this free function
/// is the row-to-domain-type mapping instead.
fn parse_job_from_row(row: &PgRow) -> Result<ParseJob, PayScopeError> {
    let status_raw: String = row.try_get("status").map_err(|e| dependency_error(e.to_string()))?;
    let status = match status_raw.as_str() {
        "PENDING" => JobStatus::Pending,
        "RUNNING" => JobStatus::Running,
        "SUCCEEDED" => JobStatus::Succeeded,
        "FAILED" => JobStatus::Failed,
        _ => JobStatus::Dlq,
    };
    Ok(ParseJob {
        job_id: row.try_get("job_id").map_err(|e| dependency_error(e.to_string()))?,
        artifact_id: row.try_get("artifact_id").map_err(|e| dependency_error(e.to_string()))?,
        status,
        attempt_count: row.try_get("attempt_count").map_err(|e| dependency_error(e.to_string()))?,
        last_error: row.try_get("last_error").map_err(|e| dependency_error(e.to_string()))?,
        claim_token: row.try_get("claim_token").map_err(|e| dependency_error(e.to_string()))?,
    })
}

/// Claims one pending job with `SELECT ... FOR UPDATE SKIP LOCKED`
/// (spec.md §4.8) so concurrent `apps/pipeline-worker` processes never
/// claim the same artifact. Sets `status=RUNNING`, a fresh random
/// `claim_token`, and increments `attempt_count` atomically with the
/// claim, all inside one transaction.
pub async fn claim_next(pool: &PgPool) -> Result<Option<ParseJob>, PayScopeError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| dependency_error(format!("begin claim transaction: {e}")))?;

    let candidate = sqlx::query(
        "SELECT job_id FROM parse_jobs
         WHERE status = 'PENDING'
         ORDER BY created_at
         FOR UPDATE SKIP LOCKED
         LIMIT 1",
    )
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| dependency_error(format!("select pending job: {e}")))?;

    let Some(row) = candidate else {
        tx.commit().await.ok();
        return Ok(None);
    };
    let job_id: Uuid = row.try_get("job_id").map_err(|e| dependency_error(e.to_string()))?;

    let claim_token = Uuid::new_v4();
    let row = sqlx::query(
        "UPDATE parse_jobs
         SET status = 'RUNNING', claim_token = $2, attempt_count = attempt_count + 1, claimed_at = now()
         WHERE job_id = $1
         RETURNING job_id, artifact_id, status, attempt_count, last_error, claim_token",
    )
    .bind(job_id)
    .bind(claim_token)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| dependency_error(format!("claim job {job_id}: {e}")))?;
    let claimed = parse_job_from_row(&row)?;

    tx.commit()
        .await
        .map_err(|e| dependency_error(format!("commit claim transaction: {e}")))?;

    Ok(Some(claimed))
}

pub async fn mark_succeeded(pool: &PgPool, job_id: Uuid) -> Result<(), PayScopeError> {
    sqlx::query("UPDATE parse_jobs SET status = 'SUCCEEDED', claim_token = NULL WHERE job_id = $1")
        .bind(job_id)
        .execute(pool)
        .await
        .map_err(|e| dependency_error(format!("mark_succeeded {job_id}: {e}")))?;
    Ok(())
}

/// Records a transient failure and returns the job to `PENDING` so the
/// next claim picks it up after the caller's chosen backoff elapses; the
/// caller (the stage loop in `apps/pipeline-worker`) is responsible for
/// actually sleeping.
pub async fn mark_retry(pool: &PgPool, job_id: Uuid, error_detail: &str) -> Result<(), PayScopeError> {
    sqlx::query("UPDATE parse_jobs SET status = 'PENDING', claim_token = NULL, last_error = $2 WHERE job_id = $1")
        .bind(job_id)
        .bind(error_detail)
        .execute(pool)
        .await
        .map_err(|e| dependency_error(format!("mark_retry {job_id}: {e}")))?;
    Ok(())
}

/// Moves a job to its terminal `FAILED`/DLQ state: retries exhausted or a
/// non-retryable error class (spec.md §4.8). `error_class` and
/// `error_detail` are retained on the DLQ entry so an operator has enough
/// context to reprocess after a fix.
pub async fn move_to_dlq(
    pool: &PgPool,
    job_id: Uuid,
    error_class: &str,
    error_detail: &str,
    payload_ref: &str,
) -> Result<(), PayScopeError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| dependency_error(format!("begin dlq transaction: {e}")))?;

    sqlx::query("UPDATE parse_jobs SET status = 'DLQ', claim_token = NULL, last_error = $2 WHERE job_id = $1")
        .bind(job_id)
        .bind(error_detail)
        .execute(&mut *tx)
        .await
        .map_err(|e| dependency_error(format!("mark job dlq {job_id}: {e}")))?;

    sqlx::query(
        "INSERT INTO dlq_entries (dlq_id, job_id, error_class, error_detail, payload_ref, created_at)
         VALUES ($1, $2, $3, $4, $5, now())",
    )
    .bind(Uuid::new_v4())
    .bind(job_id)
    .bind(error_class)
    .bind(error_detail)
    .bind(payload_ref)
    .execute(&mut *tx)
    .await
    .map_err(|e| dependency_error(format!("insert dlq entry for {job_id}: {e}")))?;

    tx.commit()
        .await
        .map_err(|e| dependency_error(format!("commit dlq transaction: {e}")))?;
    Ok(())
}

/// Returns a DLQ'd job to `PENDING` with a reset `attempt_count`, for an
/// operator-initiated reprocess after fixing whatever caused the original
/// failure (spec.md §9's DLQ reprocessing UX: a manual admin action
/// through `apps/payscope-cli`, not an automatic replay). Resetting
/// `attempt_count` means this job gets the operator's fix a full
/// `max_retries` worth of attempts before it can DLQ again.
pub async fn requeue_from_dlq(pool: &PgPool, job_id: Uuid) -> Result<(), PayScopeError> {
    let result = sqlx::query(
        "UPDATE parse_jobs SET status = 'PENDING', claim_token = NULL, attempt_count = 0, last_error = NULL
         WHERE job_id = $1 AND status = 'DLQ'",
    )
    .bind(job_id)
    .execute(pool)
    .await
    .map_err(|e| dependency_error(format!("requeue_from_dlq {job_id}: {e}")))?;

    if result.rows_affected() == 0 {
        return Err(PayScopeError::ValidationRowFailed {
            detail: format!("job {job_id} is not currently in DLQ"),
        });
    }
    Ok(())
}

/// Lists the most recent DLQ entries, newest first, for an operator to
/// triage via `apps/payscope-cli` before deciding what to requeue.
pub async fn list_dlq(pool: &PgPool, limit: i64) -> Result<Vec<DlqEntry>, PayScopeError> {
    sqlx::query_as::<_, DlqEntry>(
        "SELECT dlq_id, job_id, error_class, error_detail, payload_ref, created_at
         FROM dlq_entries
         ORDER BY created_at DESC
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| dependency_error(format!("list_dlq: {e}")))
}

/// Releases claims held by workers that crashed without clearing their
/// `claim_token`: any `RUNNING` job whose `claimed_at` is older than
/// `timeout` is returned to `PENDING` (spec.md §5 "crashed workers release
/// claims after a timeout"). Returns the number of jobs released.
pub async fn reclaim_stale(pool: &PgPool, timeout: ChronoDuration) -> Result<u64, PayScopeError> {
    let cutoff_seconds = timeout.num_seconds().max(1);
    let result = sqlx::query(
        "UPDATE parse_jobs
         SET status = 'PENDING', claim_token = NULL
         WHERE status = 'RUNNING' AND claimed_at < now() - ($1 || ' seconds')::interval",
    )
    .bind(cutoff_seconds.to_string())
    .execute(pool)
    .await
    .map_err(|e| dependency_error(format!("reclaim_stale: {e}")))?;
    Ok(result.rows_affected())
}

/// Clears this worker's own claim without changing job status, for an
/// orderly shutdown mid-stage (spec.md §5): the job is left `RUNNING` but
/// unclaimed, so `reclaim_stale` (or another worker, once its
/// `claimed_at` ages out) can pick it back up.
pub async fn release_claim(pool: &PgPool, job_id: Uuid) -> Result<(), PayScopeError> {
    sqlx::query("UPDATE parse_jobs SET claim_token = NULL WHERE job_id = $1")
        .bind(job_id)
        .execute(pool)
        .await
        .map_err(|e| dependency_error(format!("release_claim {job_id}: {e}")))?;
    Ok(())
}
