use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use crate::agent_trait::Agent;
use crate::types::{AgentResult, Evidence};

/// Routed to on the ANOMALY intent alongside `FraudAgent` (spec.md
/// glossary). Where `FraudAgent` clusters on similarity, this agent
/// checks the lifecycle graph for transitions that should never occur —
/// the clearest compliance-relevant anomaly this pipeline can surface
/// without a dedicated rules engine.
pub struct ComplianceAgent;

#[async_trait]
impl Agent for ComplianceAgent {
    fn name(&self) -> &'static str {
        "ComplianceAgent"
    }

    async fn run(&self, _task_id: Uuid, _query: &str, evidence: &Evidence) -> AgentResult {
        if evidence.graph_neighborhoods.is_empty() {
            return AgentResult {
                agent: self.name().to_string(),
                summary: "no lifecycle graph evidence available to audit".to_string(),
                metrics: json!({ "irregular_transitions": 0 }),
                confidence: 0.0,
                rationale: "empty_evidence".to_string(),
            };
        }

        let irregular: Vec<&str> = evidence
            .graph_neighborhoods
            .iter()
            .filter(|n| !is_monotone(&n.lifecycle_path))
            .map(|n| n.merchant_id.as_str())
            .collect();

        let summary = if irregular.is_empty() {
            "all observed lifecycle transitions are in AUTH -> CLEARING -> SETTLEMENT order".to_string()
        } else {
            format!("{} transaction(s) show an out-of-order lifecycle transition", irregular.len())
        };

        let confidence = if irregular.is_empty() { 0.6 } else { 0.85 };

        AgentResult {
            agent: self.name().to_string(),
            summary,
            metrics: json!({ "irregular_transitions": irregular.len() }),
            confidence,
            rationale: "lifecycle_ordering_check".to_string(),
        }
    }
}

fn is_monotone(path: &[payscope_core::model::LifecycleStage]) -> bool {
    path.windows(2).all(|pair| pair[1].ordinal() >= pair[0].ordinal())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GraphNeighborhood, TimeSeriesWindow};
    use payscope_core::model::LifecycleStage;

    #[tokio::test]
    async fn flags_out_of_order_lifecycle_path() {
        let bank_id = Uuid::new_v4();
        let evidence = Evidence {
            bank_id,
            vector_hits: vec![],
            graph_neighborhoods: vec![GraphNeighborhood {
                transaction_pk: Uuid::new_v4(),
                merchant_id: "M1".to_string(),
                lifecycle_path: vec![LifecycleStage::Settlement, LifecycleStage::Auth],
            }],
            timeseries: TimeSeriesWindow::empty(bank_id, chrono::Utc::now(), chrono::Utc::now()),
        };
        let result = ComplianceAgent.run(Uuid::new_v4(), "q", &evidence).await;
        assert_eq!(result.metrics["irregular_transitions"], 1);
    }

    #[tokio::test]
    async fn well_ordered_path_is_not_flagged() {
        let bank_id = Uuid::new_v4();
        let evidence = Evidence {
            bank_id,
            vector_hits: vec![],
            graph_neighborhoods: vec![GraphNeighborhood {
                transaction_pk: Uuid::new_v4(),
                merchant_id: "M1".to_string(),
                lifecycle_path: vec![LifecycleStage::Auth, LifecycleStage::Clearing, LifecycleStage::Settlement],
            }],
            timeseries: TimeSeriesWindow::empty(bank_id, chrono::Utc::now(), chrono::Utc::now()),
        };
        let result = ComplianceAgent.run(Uuid::new_v4(), "q", &evidence).await;
        assert_eq!(result.metrics["irregular_transitions"], 0);
    }
}
