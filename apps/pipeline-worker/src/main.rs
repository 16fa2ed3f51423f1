//! Pipeline orchestrator (C8): the worker process behind `apps/api-gateway`'s
//! upload intake. Claims one `ParseJob` at a time, runs the full
//! extract -> tag -> map -> validate -> persist pipeline, and reclaims
//! stale claims left behind by a crashed sibling (spec.md §4.8/§5).

mod rows;
mod stage;
mod state;

use std::time::Duration;

use chrono::Duration as ChronoDuration;
use payscope_core::config::PayScopeConfig;
use state::WorkerState;

/// How often a worker checks for `RUNNING` jobs whose claim has gone
/// stale. Independent of `STAGE_TIMEOUT_SECONDS`: this is how long a
/// crashed worker's claim lingers before another worker may retry it.
const RECLAIM_INTERVAL: Duration = Duration::from_secs(30);
const RECLAIM_TIMEOUT: ChronoDuration = ChronoDuration::seconds(300);

/// How long an idle worker sleeps between empty `claim_next` polls.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = PayScopeConfig::from_env().unwrap_or_else(|e| {
        eprintln!("configuration error: {e}");
        std::process::exit(2);
    });

    payscope_telemetry::init_tracing("pipeline-worker", config.env != "development");

    let state = WorkerState::build(config).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to initialize dependencies");
        std::process::exit(3);
    });

    tracing::info!(pool_size = state.config.worker_pool_size, "pipeline-worker starting claim loop");

    let mut last_reclaim = tokio::time::Instant::now();
    loop {
        if last_reclaim.elapsed() >= RECLAIM_INTERVAL {
            match payscope_jobs::reclaim_stale(&state.db_pool, RECLAIM_TIMEOUT).await {
                Ok(0) => {}
                Ok(n) => tracing::warn!(reclaimed = n, "released stale job claims"),
                Err(e) => tracing::error!(error = %e, "failed to reclaim stale job claims"),
            }
            last_reclaim = tokio::time::Instant::now();
        }

        match payscope_jobs::claim_next(&state.db_pool).await {
            Ok(Some(job)) => {
                let job_id = job.job_id;
                tracing::info!(job_id = %job_id, attempt = job.attempt_count, "claimed job");
                stage::run_job(&state, job).await;
            }
            Ok(None) => tokio::time::sleep(IDLE_POLL_INTERVAL).await,
            Err(e) => {
                tracing::error!(error = %e, "failed to claim next job");
                tokio::time::sleep(IDLE_POLL_INTERVAL).await;
            }
        }
    }
}
