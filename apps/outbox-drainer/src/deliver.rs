//! Per-destination delivery of one outbox row (spec.md §4.7/§4.9): each
//! function takes the already-claimed `OutboxRow` and the `CanonicalTransaction`
//! decoded from its payload, and performs exactly the write that
//! destination's store needs.

use chrono::{TimeZone, Utc};
use payscope_core::canonical_json;
use payscope_core::error::PayScopeError;
use payscope_core::model::{AuditEvent, CanonicalTransaction, EventType, LifecycleStage};
use payscope_stores::outbox::OutboxRow;
use payscope_stores::VectorMetadata;
use serde::Deserialize;
use uuid::Uuid;

use crate::state::DrainerState;

/// Namespace for deriving a per-transaction `AuditEvent.event_id`,
/// distinct from `payscope-persist`'s report-level event namespace so the
/// two attestations never collide under the same identity.
const TRANSACTION_EVENT_NAMESPACE: Uuid = Uuid::from_bytes([
    0x50, 0x61, 0x79, 0x53, 0x63, 0x6f, 0x70, 0x65, 0x2d, 0x54, 0x78, 0x6e, 0x45, 0x76, 0x74, 0x21,
]);

#[derive(Deserialize)]
struct OutboxPayload {
    report_id: Uuid,
    transaction: CanonicalTransaction,
}

fn decode_payload(row: &OutboxRow) -> Result<OutboxPayload, PayScopeError> {
    serde_json::from_value(row.payload.clone()).map_err(|e| PayScopeError::Internal {
        detail: format!("malformed outbox payload for {}: {e}", row.outbox_id),
    })
}

fn bucket_time(transaction: &CanonicalTransaction) -> chrono::DateTime<Utc> {
    Utc.from_utc_datetime(&transaction.timestamp_utc.date_naive().and_hms_opt(0, 0, 0).unwrap())
}

/// Appends the transaction's amount to the daily volume bucket. Uses the
/// outbox row's own id as the idempotency key, so redelivering the same
/// row (after a crash between write and `mark_delivered`) never
/// double-counts.
pub async fn deliver_timeseries(state: &DrainerState, row: &OutboxRow) -> Result<(), PayScopeError> {
    let payload = decode_payload(row)?;
    let txn = payload.transaction;
    state
        .timeseries
        .append_volume(row.bank_id, bucket_time(&txn), &txn.card_network, txn.lifecycle_stage, txn.amount, row.outbox_id)
        .await
}

/// Merges the transaction's node and, once it has moved past `Auth`, the
/// lifecycle-transition edge from `Auth` to its current stage. A fresh
/// `Auth`-stage transaction has no transition to record yet.
pub async fn deliver_graph(state: &DrainerState, row: &OutboxRow) -> Result<(), PayScopeError> {
    let payload = decode_payload(row)?;
    let txn = payload.transaction;

    state.graph.merge_transaction_node(row.bank_id, row.transaction_pk, &txn.merchant_id, &txn.card_network).await?;

    if txn.lifecycle_stage != LifecycleStage::Auth {
        state
            .graph
            .merge_lifecycle_edge(row.bank_id, row.transaction_pk, LifecycleStage::Auth, txn.lifecycle_stage)
            .await?;
    }
    Ok(())
}

fn embedding_text(transaction: &CanonicalTransaction) -> String {
    format!(
        "transaction {} merchant {} network {} amount {} {} stage {:?}",
        transaction.transaction_id, transaction.merchant_id, transaction.card_network, transaction.amount, transaction.currency, transaction.lifecycle_stage
    )
}

/// Embeds a short text summary of the transaction and upserts it into the
/// similarity index, tagged with the tenant/report/lifecycle metadata the
/// RAG engine's retrieval fetch filters on (spec.md invariant 5).
pub async fn deliver_vector(state: &DrainerState, row: &OutboxRow) -> Result<(), PayScopeError> {
    let payload = decode_payload(row)?;
    let txn = payload.transaction;

    let embedding = state.embedding.embed(&embedding_text(&txn)).await?;
    let metadata = VectorMetadata {
        report_id: payload.report_id,
        transaction_pk: row.transaction_pk,
        lifecycle_stage: txn.lifecycle_stage,
        source_type: "canonical_transaction".to_string(),
        bank_id: row.bank_id,
    };
    state.vector.upsert(&row.transaction_pk.to_string(), &embedding, &metadata).await
}

/// Attests a per-transaction audit event, separate from the report-level
/// ingest event `payscope-persist` writes directly: this gives the audit
/// ledger one entry per transaction it can replay independently of the
/// report that originally carried it.
pub async fn deliver_audit(state: &DrainerState, row: &OutboxRow) -> Result<(), PayScopeError> {
    let payload = decode_payload(row)?;
    let txn = payload.transaction;

    let artifact_hash = canonical_json::hash(&txn).map_err(|e| PayScopeError::Internal {
        detail: format!("failed to canonicalize transaction for audit event: {e}"),
    })?;
    let event = AuditEvent {
        event_id: Uuid::new_v5(&TRANSACTION_EVENT_NAMESPACE, row.transaction_pk.as_bytes()),
        event_type: EventType::Ingest,
        artifact_hash,
        schema_version: txn.schema_version.clone(),
        timestamp: Utc::now(),
    };
    state.audit.put_event(&event, &txn).await?;
    Ok(())
}
