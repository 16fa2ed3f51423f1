//! At-least-once fan-out worker (spec.md §4.7/§4.9): drains outbox rows
//! the facts store's ingest transaction left behind, one destination at a
//! time, plus the retention sweep (spec.md §3.2).

mod deliver;
mod state;

use std::time::Duration;

use chrono::Utc;
use payscope_core::config::PayScopeConfig;
use payscope_core::error::PayScopeError;
use payscope_stores::outbox::{self, OutboxDestination, OutboxRow};
use state::DrainerState;

const CLAIM_BATCH_SIZE: i64 = 25;
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(500);
const RETENTION_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = PayScopeConfig::from_env().unwrap_or_else(|e| {
        eprintln!("configuration error: {e}");
        std::process::exit(2);
    });

    payscope_telemetry::init_tracing("outbox-drainer", config.env != "development");

    let state = DrainerState::build(config).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to initialize dependencies");
        std::process::exit(3);
    });

    tracing::info!("outbox-drainer starting drain loop");

    let mut last_retention_sweep = tokio::time::Instant::now() - RETENTION_SWEEP_INTERVAL;
    loop {
        if state.config.retention_enabled() && last_retention_sweep.elapsed() >= RETENTION_SWEEP_INTERVAL {
            run_retention_sweep(&state).await;
            last_retention_sweep = tokio::time::Instant::now();
        }

        let mut drained_any = false;
        for destination in OutboxDestination::ALL {
            match outbox::claim_pending(&state.db_pool, destination, CLAIM_BATCH_SIZE).await {
                Ok(rows) if !rows.is_empty() => {
                    drained_any = true;
                    for row in rows {
                        drain_one(&state, destination, row).await;
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, ?destination, "failed to claim outbox rows"),
            }
        }

        if !drained_any {
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
        }
    }
}

/// `MAX_RETRIES` from config doubles as the outbox delivery retry ceiling:
/// both are "how many transient failures before an operator needs to
/// look at this", and the drainer has no reason to carry its own
/// separately-configured threshold.
async fn drain_one(state: &DrainerState, destination: OutboxDestination, row: OutboxRow) {
    let outbox_id = row.outbox_id;
    let attempt_count = row.attempt_count;

    let result: Result<(), PayScopeError> = match destination {
        OutboxDestination::TimeSeries => deliver::deliver_timeseries(state, &row).await,
        OutboxDestination::Graph => deliver::deliver_graph(state, &row).await,
        OutboxDestination::Vector => deliver::deliver_vector(state, &row).await,
        OutboxDestination::Audit => deliver::deliver_audit(state, &row).await,
    };

    match result {
        Ok(()) => {
            if let Err(e) = outbox::mark_delivered(&state.db_pool, outbox_id).await {
                tracing::error!(error = %e, %outbox_id, "failed to mark outbox row delivered");
            }
        }
        Err(e) => {
            let exhausted = attempt_count as u32 >= state.config.max_retries || !e.is_retryable();
            if exhausted {
                tracing::warn!(error = %e, %outbox_id, ?destination, "outbox delivery exhausted, moving to DLQ");
                if let Err(dlq_err) = outbox::move_to_dlq(&state.db_pool, outbox_id, &e.to_string()).await {
                    tracing::error!(error = %dlq_err, %outbox_id, "failed to move outbox row to DLQ");
                }
            } else {
                tracing::warn!(error = %e, %outbox_id, ?destination, attempt_count, "outbox delivery failed, will retry");
                if let Err(mark_err) = outbox::mark_attempt_failed(&state.db_pool, outbox_id).await {
                    tracing::error!(error = %mark_err, %outbox_id, "failed to record outbox delivery attempt");
                }
            }
        }
    }
}

/// Deletes raw artifacts older than `RETENTION_DAYS_RAW` (object bytes
/// first, then the row, so a crash mid-sweep leaves an orphaned row
/// rather than an orphaned object that nothing will ever clean up) and
/// aggregated time-series rows older than `RETENTION_DAYS_AGGREGATED`.
async fn run_retention_sweep(state: &DrainerState) {
    if let Some(days) = state.config.retention_days_raw {
        let cutoff = Utc::now() - chrono::Duration::days(days as i64);
        match payscope_jobs::artifacts_older_than(&state.db_pool, cutoff).await {
            Ok(candidates) => {
                let count = candidates.len();
                for (artifact_id, object_key) in candidates {
                    if let Err(e) = delete_one_artifact(state, artifact_id, &object_key).await {
                        tracing::error!(error = %e, %artifact_id, "failed to delete artifact during retention sweep");
                    }
                }
                if count > 0 {
                    tracing::info!(count, "retention sweep removed raw artifacts");
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to list artifacts for retention sweep"),
        }
    }

    if let Some(days) = state.config.retention_days_aggregated {
        let cutoff = Utc::now() - chrono::Duration::days(days as i64);
        match state.timeseries.delete_before(cutoff).await {
            Ok(0) => {}
            Ok(n) => tracing::info!(deleted = n, "retention sweep removed aggregated time-series rows"),
            Err(e) => tracing::error!(error = %e, "failed to delete aggregated time-series rows during retention sweep"),
        }
    }
}

async fn delete_one_artifact(state: &DrainerState, artifact_id: uuid::Uuid, object_key: &str) -> Result<(), PayScopeError> {
    state.objects.delete(object_key).await?;
    payscope_jobs::delete_artifact_row(&state.db_pool, artifact_id).await
}
