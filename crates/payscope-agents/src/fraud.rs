use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use crate::agent_trait::Agent;
use crate::types::{AgentResult, Evidence};

/// Score above which a vector hit counts as a suspicious match rather
/// than routine retrieval noise. Conservative on purpose: false positives
/// here become analyst-visible flags, not silent drops.
const SUSPICIOUS_SCORE_THRESHOLD: f64 = 0.82;

/// Routed to on the ANOMALY intent (spec.md glossary). Looks for
/// clustering of high-similarity vector hits against a small number of
/// merchants, which is the retrieval-side signature of a fraud spike: one
/// bad actor or compromised merchant generating many near-duplicate
/// transactions.
pub struct FraudAgent;

#[async_trait]
impl Agent for FraudAgent {
    fn name(&self) -> &'static str {
        "FraudAgent"
    }

    async fn run(&self, _task_id: Uuid, _query: &str, evidence: &Evidence) -> AgentResult {
        if evidence.is_empty() {
            return AgentResult {
                agent: self.name().to_string(),
                summary: "no evidence retrieved for this tenant and range; cannot assess fraud risk".to_string(),
                metrics: json!({ "suspicious_count": 0 }),
                confidence: 0.0,
                rationale: "empty_evidence".to_string(),
            };
        }

        let suspicious: Vec<_> = evidence
            .vector_hits
            .iter()
            .filter(|h| h.score >= SUSPICIOUS_SCORE_THRESHOLD)
            .collect();

        let distinct_merchants: std::collections::HashSet<&str> = evidence
            .graph_neighborhoods
            .iter()
            .filter(|n| suspicious.iter().any(|h| h.transaction_pk == n.transaction_pk))
            .map(|n| n.merchant_id.as_str())
            .collect();

        let suspicious_count = suspicious.len();
        let concentration = if distinct_merchants.is_empty() {
            0.0
        } else {
            suspicious_count as f64 / distinct_merchants.len() as f64
        };

        // More hits concentrated on fewer merchants raises confidence that
        // this is a genuine cluster rather than coincidental similarity.
        let confidence = (0.3 + concentration.min(5.0) / 10.0).min(0.95);

        let summary = if suspicious_count == 0 {
            "no transactions scored above the suspicious-similarity threshold".to_string()
        } else {
            format!(
                "{suspicious_count} transaction(s) scored above the suspicious-similarity threshold across {} merchant(s)",
                distinct_merchants.len().max(1)
            )
        };

        AgentResult {
            agent: self.name().to_string(),
            summary,
            metrics: json!({
                "suspicious_count": suspicious_count,
                "distinct_merchants": distinct_merchants.len(),
            }),
            confidence,
            rationale: "vector_similarity_clustering".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GraphNeighborhood, TimeSeriesWindow, VectorHit};
    use payscope_core::model::LifecycleStage;

    fn hit(score: f64, pk: Uuid) -> VectorHit {
        VectorHit {
            vector_id: pk.to_string(),
            score,
            transaction_pk: pk,
            lifecycle_stage: LifecycleStage::Auth,
        }
    }

    #[tokio::test]
    async fn flags_high_similarity_hits_on_shared_merchant() {
        let pk1 = Uuid::new_v4();
        let pk2 = Uuid::new_v4();
        let bank_id = Uuid::new_v4();
        let evidence = Evidence {
            bank_id,
            vector_hits: vec![hit(0.9, pk1), hit(0.85, pk2), hit(0.2, Uuid::new_v4())],
            graph_neighborhoods: vec![
                GraphNeighborhood {
                    transaction_pk: pk1,
                    merchant_id: "M1".to_string(),
                    lifecycle_path: vec![LifecycleStage::Auth],
                },
                GraphNeighborhood {
                    transaction_pk: pk2,
                    merchant_id: "M1".to_string(),
                    lifecycle_path: vec![LifecycleStage::Auth],
                },
            ],
            timeseries: TimeSeriesWindow::empty(bank_id, chrono::Utc::now(), chrono::Utc::now()),
        };

        let result = FraudAgent.run(Uuid::new_v4(), "q", &evidence).await;
        assert_eq!(result.metrics["suspicious_count"], 2);
        assert!(result.confidence > 0.3);
    }

    #[tokio::test]
    async fn empty_evidence_yields_zero_confidence() {
        let bank_id = Uuid::new_v4();
        let evidence = Evidence {
            bank_id,
            vector_hits: vec![],
            graph_neighborhoods: vec![],
            timeseries: TimeSeriesWindow::empty(bank_id, chrono::Utc::now(), chrono::Utc::now()),
        };
        let result = FraudAgent.run(Uuid::new_v4(), "q", &evidence).await;
        assert_eq!(result.confidence, 0.0);
    }
}
