use chrono::{DateTime, Utc};
use payscope_core::error::PayScopeError;
use payscope_core::model::LifecycleStage;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

fn dependency_error(detail: impl Into<String>) -> PayScopeError {
    PayScopeError::DependencyUnavailable {
        dependency: "timeseries_store".to_string(),
        detail: detail.into(),
    }
}

/// Append-only aggregate row keyed by `(bucket_time, bank_id,
/// source_network, lifecycle_stage)` (spec.md §4.7 step 3). Deliberately
/// has no update/delete method: invariant 3 requires the storage layer
/// itself to reject mutation, but this type also never offers the call.
pub struct TimeSeriesStore {
    pool: PgPool,
}

impl TimeSeriesStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends one volume-aggregate row. Idempotent per
    /// `(bank_id, transaction_pk, destination)` via the outbox drainer's
    /// idempotency key, not via any update here: a redelivered event
    /// produces a harmless duplicate append that downstream aggregation
    /// treats additively only once, keyed by `idempotency_key`.
    pub async fn append_volume(
        &self,
        bank_id: Uuid,
        bucket_time: DateTime<Utc>,
        source_network: &str,
        lifecycle_stage: LifecycleStage,
        amount: Decimal,
        idempotency_key: Uuid,
    ) -> Result<(), PayScopeError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| dependency_error(format!("acquire connection: {e}")))?;

        payscope_tenant::context::bind_session(bank_id, &mut *conn, move |conn: &mut PgConnection| async move {
            sqlx::query(
                "INSERT INTO transaction_volume
                     (bucket_time, bank_id, source_network, lifecycle_stage, amount, idempotency_key, recorded_at)
                 VALUES ($1, $2, $3, $4, $5, $6, now())
                 ON CONFLICT (idempotency_key) DO NOTHING",
            )
            .bind(bucket_time)
            .bind(bank_id)
            .bind(source_network)
            .bind(serde_json::to_string(&lifecycle_stage).unwrap_or_default())
            .bind(amount)
            .bind(idempotency_key)
            .execute(conn)
            .await
            .map_err(|e| dependency_error(format!("append_volume: {e}")))?;
            Ok(())
        })
        .await
    }

    /// Sums appended volume for `bank_id` within `[from, to]`, used by the
    /// RAG engine's time-series retrieval fetch.
    pub async fn aggregate_range(
        &self,
        bank_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Decimal, PayScopeError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| dependency_error(format!("acquire connection: {e}")))?;

        payscope_tenant::context::bind_session(bank_id, &mut *conn, move |conn: &mut PgConnection| async move {
            sqlx::query_scalar(
                "SELECT coalesce(sum(amount), 0) FROM transaction_volume
                 WHERE bank_id = $1 AND bucket_time BETWEEN $2 AND $3",
            )
            .bind(bank_id)
            .bind(from)
            .bind(to)
            .fetch_one(conn)
            .await
            .map_err(|e| dependency_error(format!("aggregate_range: {e}")))
        })
        .await
    }

    /// Daily-bucketed volume for `bank_id` within `[from, to]`, ordered by
    /// bucket. Feeds the RAG engine's retrieval fetch, which hands the
    /// series to the forecasting and simulation agents as-is.
    pub async fn bucketed_range(
        &self,
        bank_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<(DateTime<Utc>, Decimal)>, PayScopeError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| dependency_error(format!("acquire connection: {e}")))?;

        payscope_tenant::context::bind_session(bank_id, &mut *conn, move |conn: &mut PgConnection| async move {
            let rows: Vec<(DateTime<Utc>, Decimal)> = sqlx::query_as(
                "SELECT date_trunc('day', bucket_time) AS bucket_day, sum(amount)
                 FROM transaction_volume
                 WHERE bank_id = $1 AND bucket_time BETWEEN $2 AND $3
                 GROUP BY bucket_day
                 ORDER BY bucket_day",
            )
            .bind(bank_id)
            .bind(from)
            .bind(to)
            .fetch_all(conn)
            .await
            .map_err(|e| dependency_error(format!("bucketed_range: {e}")))?;
            Ok(rows)
        })
        .await
    }

    /// Deletes aggregated volume rows older than `cutoff`, for the
    /// retention sweep (spec.md §3.2's 2-year aggregated default). Global
    /// across tenants: the sweep runs on a schedule, not per-tenant
    /// request, so there is no `bank_id` to scope it to, and no session
    /// binding applies.
    pub async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64, PayScopeError> {
        let result = sqlx::query("DELETE FROM transaction_volume WHERE bucket_time < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| dependency_error(format!("delete_before: {e}")))?;
        Ok(result.rows_affected())
    }

    pub async fn row_count(&self, bank_id: Uuid) -> Result<i64, PayScopeError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| dependency_error(format!("acquire connection: {e}")))?;

        payscope_tenant::context::bind_session(bank_id, &mut *conn, move |conn: &mut PgConnection| async move {
            sqlx::query_scalar("SELECT count(*) FROM transaction_volume WHERE bank_id = $1")
                .bind(bank_id)
                .fetch_one(conn)
                .await
                .map_err(|e| dependency_error(format!("row_count: {e}")))
        })
        .await
    }
}
