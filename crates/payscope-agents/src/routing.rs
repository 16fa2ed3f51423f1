use std::time::Duration;

use uuid::Uuid;

use crate::agent_trait::{run_bounded, Agent};
use crate::compliance::ComplianceAgent;
use crate::forecasting::ForecastingAgent;
use crate::fraud::FraudAgent;
use crate::reconciliation::ReconciliationAgent;
use crate::simulation::SimulationAgent;
use crate::types::{AgentResult, Evidence};

/// The query intents the RAG engine classifies a chat query into
/// (spec.md §4.11). Owned here rather than in `payscope-rag` so the
/// routing table and the intents it routes stay next to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Describe,
    Compare,
    Anomaly,
    Forecast,
    WhatIf,
}

/// The fixed routing table from spec.md's glossary: ANOMALY fans out to
/// both FraudAgent and ComplianceAgent; every other intent maps to
/// exactly one agent.
pub fn agents_for(intent: Intent) -> Vec<&'static dyn Agent> {
    static FRAUD: FraudAgent = FraudAgent;
    static COMPLIANCE: ComplianceAgent = ComplianceAgent;
    static RECONCILIATION: ReconciliationAgent = ReconciliationAgent;
    static FORECASTING: ForecastingAgent = ForecastingAgent;
    static SIMULATION: SimulationAgent = SimulationAgent;

    match intent {
        Intent::Anomaly => vec![&FRAUD, &COMPLIANCE],
        Intent::Compare => vec![&RECONCILIATION],
        Intent::Describe => vec![&RECONCILIATION],
        Intent::Forecast => vec![&FORECASTING],
        Intent::WhatIf => vec![&SIMULATION],
    }
}

/// Runs every agent the intent routes to, each under its own wall-clock
/// deadline, concurrently. Partial failures (a timed-out agent) surface
/// as a low-confidence `AgentResult` rather than failing the whole dispatch.
pub async fn dispatch(intent: Intent, task_id: Uuid, query: &str, evidence: &Evidence, per_agent_timeout: Duration) -> Vec<AgentResult> {
    let agents = agents_for(intent);
    let futures = agents.into_iter().map(|agent| run_bounded(agent, task_id, query, evidence, per_agent_timeout));
    futures::future::join_all(futures).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anomaly_routes_to_fraud_and_compliance() {
        assert_eq!(agents_for(Intent::Anomaly).len(), 2);
    }

    #[test]
    fn describe_and_compare_both_route_to_reconciliation() {
        assert_eq!(agents_for(Intent::Describe)[0].name(), "ReconciliationAgent");
        assert_eq!(agents_for(Intent::Compare)[0].name(), "ReconciliationAgent");
    }

    #[tokio::test]
    async fn dispatch_runs_all_routed_agents() {
        let bank_id = Uuid::new_v4();
        let evidence = Evidence {
            bank_id,
            vector_hits: vec![],
            graph_neighborhoods: vec![],
            timeseries: crate::types::TimeSeriesWindow::empty(bank_id, chrono::Utc::now(), chrono::Utc::now()),
        };
        let results = dispatch(Intent::Anomaly, Uuid::new_v4(), "is this fraud?", &evidence, Duration::from_secs(5)).await;
        assert_eq!(results.len(), 2);
    }
}
