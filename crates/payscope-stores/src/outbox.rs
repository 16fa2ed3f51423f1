use chrono::{DateTime, Utc};
use payscope_core::error::PayScopeError;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

/// One of the destinations an outbox row must be fanned out to. A row is
/// fully drained once it has a successful delivery record for each of
/// these four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxDestination {
    TimeSeries,
    Graph,
    Vector,
    Audit,
}

impl OutboxDestination {
    pub const ALL: [OutboxDestination; 4] = [
        OutboxDestination::TimeSeries,
        OutboxDestination::Graph,
        OutboxDestination::Vector,
        OutboxDestination::Audit,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OutboxDestination::TimeSeries => "time_series",
            OutboxDestination::Graph => "graph",
            OutboxDestination::Vector => "vector",
            OutboxDestination::Audit => "audit",
        }
    }
}

/// A durable record of "this canonical write must still be fanned out".
/// Inserted in the same transaction as the authoritative facts-store
/// write; drained by `apps/outbox-drainer` with at-least-once delivery.
#[derive(Debug, Clone)]
pub struct OutboxRow {
    pub outbox_id: Uuid,
    pub bank_id: Uuid,
    pub transaction_pk: Uuid,
    pub payload: serde_json::Value,
    pub attempt_count: i32,
    pub created_at: DateTime<Utc>,
}

impl FromRow<'_, PgRow> for OutboxRow {
    fn from_row(row: &PgRow) -> sqlx::Result<Self> {
        Ok(OutboxRow {
            outbox_id: row.try_get("outbox_id")?,
            bank_id: row.try_get("bank_id")?,
            transaction_pk: row.try_get("transaction_pk")?,
            payload: row.try_get("payload")?,
            attempt_count: row.try_get("attempt_count")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

fn dependency_error(detail: impl Into<String>) -> PayScopeError {
    PayScopeError::DependencyUnavailable {
        dependency: "facts_store".to_string(),
        detail: detail.into(),
    }
}

/// Inserts one outbox row per destination, within the caller's open
/// transaction, so the outbox write and the authoritative row write are
/// atomic together.
pub async fn insert_outbox_rows(
    tx: &mut Transaction<'_, Postgres>,
    bank_id: Uuid,
    transaction_pk: Uuid,
    payload: &serde_json::Value,
) -> Result<(), PayScopeError> {
    for destination in OutboxDestination::ALL {
        sqlx::query(
            "INSERT INTO outbox (outbox_id, bank_id, transaction_pk, destination, payload, attempt_count, created_at)
             VALUES ($1, $2, $3, $4, $5, 0, now())",
        )
        .bind(Uuid::new_v4())
        .bind(bank_id)
        .bind(transaction_pk)
        .bind(destination.as_str())
        .bind(payload)
        .execute(&mut **tx)
        .await
        .map_err(|e| dependency_error(format!("insert outbox row for {destination:?}: {e}")))?;
    }
    Ok(())
}

/// Claims up to `limit` undelivered outbox rows for `destination` using
/// `FOR UPDATE SKIP LOCKED`, so concurrent drainers never double-claim the
/// same row (spec.md §4.8 claim pattern, reused here for the drainer).
pub async fn claim_pending(
    pool: &PgPool,
    destination: OutboxDestination,
    limit: i64,
) -> Result<Vec<OutboxRow>, PayScopeError> {
    sqlx::query_as::<_, OutboxRow>(
        "SELECT outbox_id, bank_id, transaction_pk, payload, attempt_count, created_at
         FROM outbox
         WHERE destination = $1 AND delivered_at IS NULL AND dlq_at IS NULL
         ORDER BY created_at
         FOR UPDATE SKIP LOCKED
         LIMIT $2",
    )
    .bind(destination.as_str())
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| dependency_error(format!("claim outbox rows for {destination:?}: {e}")))
}

pub async fn mark_delivered(pool: &PgPool, outbox_id: Uuid) -> Result<(), PayScopeError> {
    sqlx::query("UPDATE outbox SET delivered_at = now() WHERE outbox_id = $1")
        .bind(outbox_id)
        .execute(pool)
        .await
        .map_err(|e| dependency_error(format!("mark_delivered {outbox_id}: {e}")))?;
    Ok(())
}

pub async fn mark_attempt_failed(pool: &PgPool, outbox_id: Uuid) -> Result<(), PayScopeError> {
    sqlx::query("UPDATE outbox SET attempt_count = attempt_count + 1 WHERE outbox_id = $1")
        .bind(outbox_id)
        .execute(pool)
        .await
        .map_err(|e| dependency_error(format!("mark_attempt_failed {outbox_id}: {e}")))?;
    Ok(())
}

pub async fn move_to_dlq(pool: &PgPool, outbox_id: Uuid, error_detail: &str) -> Result<(), PayScopeError> {
    sqlx::query("UPDATE outbox SET dlq_at = now(), last_error = $2 WHERE outbox_id = $1")
        .bind(outbox_id)
        .bind(error_detail)
        .execute(pool)
        .await
        .map_err(|e| dependency_error(format!("move_to_dlq {outbox_id}: {e}")))?;
    Ok(())
}
