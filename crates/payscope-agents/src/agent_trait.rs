use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use crate::types::{AgentResult, Evidence};

/// An agent in the suite (spec.md §4.12). Implementations must tolerate
/// partial evidence (reflect it in `confidence`, never panic or fabricate
/// data) and stay within the tenant scope implied by `evidence.bank_id` —
/// none of them accept a store handle, so there is nothing to scope.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, task_id: Uuid, query: &str, evidence: &Evidence) -> AgentResult;
}

/// Runs `agent` under a wall-clock deadline; a timed-out agent is
/// cancelled and recorded with a `timeout` rationale rather than left to
/// run unbounded (spec.md §4.12).
pub async fn run_bounded(agent: &dyn Agent, task_id: Uuid, query: &str, evidence: &Evidence, timeout: Duration) -> AgentResult {
    match tokio::time::timeout(timeout, agent.run(task_id, query, evidence)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(agent = agent.name(), task_id = %task_id, "agent exceeded its time budget");
            AgentResult::timed_out(agent.name())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct SlowAgent;

    #[async_trait]
    impl Agent for SlowAgent {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn run(&self, _task_id: Uuid, _query: &str, _evidence: &Evidence) -> AgentResult {
            tokio::time::sleep(Duration::from_millis(200)).await;
            AgentResult {
                agent: "slow".to_string(),
                summary: "done".to_string(),
                metrics: json!({}),
                confidence: 1.0,
                rationale: "ok".to_string(),
            }
        }
    }

    fn empty_evidence() -> Evidence {
        Evidence {
            bank_id: Uuid::new_v4(),
            vector_hits: vec![],
            graph_neighborhoods: vec![],
            timeseries: crate::types::TimeSeriesWindow::empty(Uuid::new_v4(), chrono::Utc::now(), chrono::Utc::now()),
        }
    }

    #[tokio::test]
    async fn slow_agent_is_cancelled_and_recorded_as_timeout() {
        let result = run_bounded(&SlowAgent, Uuid::new_v4(), "q", &empty_evidence(), Duration::from_millis(10)).await;
        assert_eq!(result.rationale, "timeout");
        assert_eq!(result.confidence, 0.0);
    }

    #[tokio::test]
    async fn fast_agent_completes_normally() {
        let result = run_bounded(&SlowAgent, Uuid::new_v4(), "q", &empty_evidence(), Duration::from_secs(5)).await;
        assert_eq!(result.rationale, "ok");
    }
}
