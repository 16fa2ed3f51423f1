//! Operator CLI (spec.md §4.15/§9): dataset validation, DLQ triage, and a
//! dependency health probe, for running by hand or from a runbook rather
//! than through the HTTP surface `apps/api-gateway` exposes to tenants.

mod state;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use payscope_core::config::PayScopeConfig;
use uuid::Uuid;

use state::CliState;

#[derive(Parser)]
#[command(name = "payscope-cli", about = "PayScope operator CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Cross-store row/node/record counts for a bank (spec.md §4.15).
    ValidateDatasets {
        #[arg(long)]
        bank_id: Uuid,
    },
    /// Inspect or reprocess jobs parked in the DLQ (spec.md §9).
    #[command(subcommand)]
    Dlq(DlqCommand),
    /// Probe every configured dependency and report per-dependency status.
    Health,
}

#[derive(Subcommand)]
enum DlqCommand {
    /// List the most recent DLQ entries, newest first.
    List {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Return a DLQ'd job to PENDING with a reset attempt count.
    Requeue {
        #[arg(long)]
        job_id: Uuid,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match PayScopeConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::from(2);
        }
    };

    payscope_telemetry::init_tracing("payscope-cli", false);

    let state = match CliState::build(&config).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("failed to reach dependencies: {e}");
            return ExitCode::from(3);
        }
    };

    match cli.command {
        Command::ValidateDatasets { bank_id } => run_validate_datasets(&state, bank_id).await,
        Command::Dlq(DlqCommand::List { limit }) => run_dlq_list(&state, limit).await,
        Command::Dlq(DlqCommand::Requeue { job_id }) => run_dlq_requeue(&state, job_id).await,
        Command::Health => run_health(&state).await,
    }
}

async fn run_validate_datasets(state: &CliState, bank_id: Uuid) -> ExitCode {
    match payscope_stores::validate::count_rows(&state.facts, &state.timeseries, &state.graph, &state.vector, bank_id).await {
        Ok(counts) => {
            println!("{}", serde_json::to_string_pretty(&counts).unwrap_or_else(|_| "{}".to_string()));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("dataset validation failed: {e}");
            ExitCode::from(4)
        }
    }
}

async fn run_dlq_list(state: &CliState, limit: i64) -> ExitCode {
    match payscope_jobs::list_dlq(&state.db_pool, limit).await {
        Ok(entries) => {
            if entries.is_empty() {
                println!("DLQ is empty");
            }
            for entry in entries {
                println!(
                    "{}  job={}  class={}  detail={}  ref={}",
                    entry.created_at.to_rfc3339(),
                    entry.job_id,
                    entry.error_class,
                    entry.error_detail,
                    entry.payload_ref
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("failed to list DLQ: {e}");
            ExitCode::from(3)
        }
    }
}

async fn run_dlq_requeue(state: &CliState, job_id: Uuid) -> ExitCode {
    match payscope_jobs::requeue_from_dlq(&state.db_pool, job_id).await {
        Ok(()) => {
            println!("job {job_id} requeued");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("requeue failed: {e}");
            ExitCode::from(4)
        }
    }
}

fn status_of<T>(result: Result<T, payscope_core::error::PayScopeError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(_) => "error",
    }
}

async fn run_health(state: &CliState) -> ExitCode {
    let probe_bank_id = Uuid::nil();

    let facts = state.facts.transaction_count(probe_bank_id).await;
    let ts = state.timeseries.row_count(probe_bank_id).await;
    let graph = state.graph.node_count(probe_bank_id).await;
    let vector = state.vector.record_count(probe_bank_id).await;
    let object = state.objects.put("_health/probe", Vec::new()).await;
    let queue = payscope_jobs::pending_job_count(&state.db_pool).await;

    let statuses = [
        ("facts", status_of(facts)),
        ("timeseries", status_of(ts)),
        ("graph", status_of(graph)),
        ("vector", status_of(vector)),
        ("object_store", status_of(object)),
        ("job_queue", status_of(queue)),
    ];

    let mut all_ok = true;
    for (name, status) in statuses {
        println!("{name}: {status}");
        all_ok &= status == "ok";
    }

    if all_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(3)
    }
}
