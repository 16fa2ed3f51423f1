use payscope_core::error::PayScopeError;
use payscope_core::model::{CanonicalReport, CanonicalTransaction};
use sqlx::{Connection, PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::outbox;

fn dependency_error(detail: impl Into<String>) -> PayScopeError {
    PayScopeError::DependencyUnavailable {
        dependency: "facts_store".to_string(),
        detail: detail.into(),
    }
}

/// The relational facts store (invariants 1, 2 of `spec.md` §3). Every
/// query here runs under a transaction with `payscope.current_bank_id`
/// already bound by the caller's `TenantContext`; row-security policies
/// on each table enforce that binding server-side.
pub struct FactsStore {
    pool: PgPool,
}

impl FactsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Upserts a report and its transactions, then appends one outbox row
    /// per transaction per downstream destination, all in a single
    /// transaction (spec.md §4.7 steps 1-2 plus the outbox insert).
    ///
    /// Returns the `transaction_pk` assigned to each canonical transaction,
    /// in input order, for the caller to pass on to the graph/vector/audit
    /// fan-out payloads.
    pub async fn persist_ingest(
        &self,
        bank_id: Uuid,
        report: &CanonicalReport,
        transactions: &[CanonicalTransaction],
    ) -> Result<Vec<Uuid>, PayScopeError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| dependency_error(format!("acquire connection: {e}")))?;

        payscope_tenant::context::bind_session(bank_id, &mut *conn, move |conn: &mut PgConnection| async move {
            let mut tx: Transaction<'_, Postgres> = conn.begin().await.map_err(|e| dependency_error(format!("begin transaction: {e}")))?;

            sqlx::query(
                "INSERT INTO reports (report_id, bank_id, report_type, ingestion_time, source_network, record_count, schema_version)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 ON CONFLICT (report_id) DO UPDATE SET record_count = EXCLUDED.record_count",
            )
            .bind(report.report_id)
            .bind(bank_id)
            .bind(&report.report_type)
            .bind(report.ingestion_time)
            .bind(&report.source_network)
            .bind(report.record_count)
            .bind(&report.schema_version)
            .execute(&mut *tx)
            .await
            .map_err(|e| dependency_error(format!("upsert report {}: {e}", report.report_id)))?;

            let mut transaction_pks = Vec::with_capacity(transactions.len());
            for txn in transactions {
                sqlx::query(
                    "INSERT INTO merchants (bank_id, merchant_id, card_network)
                     VALUES ($1, $2, $3)
                     ON CONFLICT (bank_id, merchant_id) DO NOTHING",
                )
                .bind(bank_id)
                .bind(&txn.merchant_id)
                .bind(&txn.card_network)
                .execute(&mut *tx)
                .await
                .map_err(|e| dependency_error(format!("upsert merchant {}: {e}", txn.merchant_id)))?;

                let transaction_pk: Uuid = sqlx::query_scalar(
                    "INSERT INTO transactions
                         (transaction_pk, bank_id, report_id, transaction_id, amount, currency,
                          timestamp_utc, lifecycle_stage, merchant_id, card_network,
                          confidence_score, schema_version, mapping_source)
                     VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                     ON CONFLICT (bank_id, transaction_id, lifecycle_stage, schema_version)
                     DO UPDATE SET
                         amount = EXCLUDED.amount,
                         confidence_score = EXCLUDED.confidence_score,
                         timestamp_utc = EXCLUDED.timestamp_utc
                     RETURNING transaction_pk",
                )
                .bind(bank_id)
                .bind(report.report_id)
                .bind(&txn.transaction_id)
                .bind(txn.amount)
                .bind(&txn.currency)
                .bind(txn.timestamp_utc)
                .bind(serde_json::to_string(&txn.lifecycle_stage).unwrap_or_default())
                .bind(&txn.merchant_id)
                .bind(&txn.card_network)
                .bind(txn.confidence_score)
                .bind(&txn.schema_version)
                .bind(serde_json::to_string(&txn.mapping_source).unwrap_or_default())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| dependency_error(format!("upsert transaction {}: {e}", txn.transaction_id)))?;

                let payload = serde_json::json!({
                    "transaction_pk": transaction_pk,
                    "report_id": report.report_id,
                    "transaction": txn,
                });
                outbox::insert_outbox_rows(&mut tx, bank_id, transaction_pk, &payload).await?;

                transaction_pks.push(transaction_pk);
            }

            tx.commit()
                .await
                .map_err(|e| dependency_error(format!("commit ingest transaction: {e}")))?;

            Ok(transaction_pks)
        })
        .await
    }

    /// Row count for the bank, read on a connection bound to `bank_id` via
    /// `current_bank_id()` for the duration of the query (spec.md §3's
    /// row-security contract); used by `payscope-stores::validate::count_rows`.
    pub async fn transaction_count(&self, bank_id: Uuid) -> Result<i64, PayScopeError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| dependency_error(format!("acquire connection: {e}")))?;

        payscope_tenant::context::bind_session(bank_id, &mut *conn, move |conn: &mut PgConnection| async move {
            sqlx::query_scalar("SELECT count(*) FROM transactions WHERE bank_id = $1")
                .bind(bank_id)
                .fetch_one(conn)
                .await
                .map_err(|e| dependency_error(format!("count transactions: {e}")))
        })
        .await
    }
}
