use std::time::Duration;

use payscope_agents::{AgentResult, Evidence};
use uuid::Uuid;

use crate::types::Intent;

/// `dispatch(intent, evidence) -> [AgentResult]` (spec.md §4.11). Thin
/// wrapper over the agent suite's own routing table and bounded runner —
/// this crate decides *when* to dispatch, the agent suite decides *who*
/// and under what deadline.
pub async fn dispatch(intent: Intent, task_id: Uuid, query: &str, evidence: &Evidence, per_agent_timeout: Duration) -> Vec<AgentResult> {
    payscope_agents::dispatch(intent, task_id, query, evidence, per_agent_timeout).await
}
