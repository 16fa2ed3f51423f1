use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use uuid::Uuid;

use crate::agent_trait::Agent;
use crate::types::{AgentResult, Evidence};

/// Routed to on the WHAT_IF intent (spec.md glossary). Reuses the
/// observed time-series baseline and applies a scenario multiplier
/// parsed out of the query text, rather than running its own regression —
/// a what-if answer is a perturbation of the known baseline, not a new
/// forecast.
pub struct SimulationAgent;

/// Parses "increase by 20%", "drop 15 percent", "+10%", "-30%" style
/// phrasing into a multiplier. Defaults to 1.10 (a mild +10% scenario)
/// when the query names no explicit magnitude, so the agent always has
/// something concrete to report rather than refusing.
fn parse_scenario_factor(query: &str) -> f64 {
    let lower = query.to_lowercase();
    let pattern = Regex::new(r"([+-]?\d+(?:\.\d+)?)\s*(?:%|percent)").expect("static regex is valid");

    let Some(caps) = pattern.captures(&lower) else {
        return 1.10;
    };
    let magnitude: f64 = caps[1].parse().unwrap_or(10.0);
    let is_decrease = lower.contains("decrease") || lower.contains("drop") || lower.contains("down") || magnitude < 0.0;

    let signed = if is_decrease { -magnitude.abs() } else { magnitude.abs() };
    1.0 + signed / 100.0
}

#[async_trait]
impl Agent for SimulationAgent {
    fn name(&self) -> &'static str {
        "SimulationAgent"
    }

    async fn run(&self, _task_id: Uuid, query: &str, evidence: &Evidence) -> AgentResult {
        if evidence.timeseries.points.is_empty() {
            return AgentResult {
                agent: self.name().to_string(),
                summary: "no time-series baseline available to simulate against".to_string(),
                metrics: json!({}),
                confidence: 0.0,
                rationale: "empty_evidence".to_string(),
            };
        }

        let factor = parse_scenario_factor(query);
        let baseline = evidence.timeseries.total_amount.to_string().parse::<f64>().unwrap_or(0.0);
        let projected = baseline * factor;

        let confidence = if evidence.timeseries.points.len() >= 4 { 0.55 } else { 0.3 };

        AgentResult {
            agent: self.name().to_string(),
            summary: format!("under a {:+.0}% scenario, projected volume is {projected:.2} against a baseline of {baseline:.2}", (factor - 1.0) * 100.0),
            metrics: json!({
                "baseline": baseline,
                "factor": factor,
                "projected": projected,
            }),
            confidence,
            rationale: "baseline_perturbation".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TimeSeriesPoint, TimeSeriesWindow};
    use rust_decimal_macros::dec;

    fn window() -> Evidence {
        let bank_id = Uuid::new_v4();
        let now = chrono::Utc::now();
        Evidence {
            bank_id,
            vector_hits: vec![],
            graph_neighborhoods: vec![],
            timeseries: TimeSeriesWindow {
                bank_id,
                from: now,
                to: now,
                total_amount: dec!(1000.00),
                points: vec![TimeSeriesPoint { bucket_time: now, amount: dec!(1000.00) }],
            },
        }
    }

    #[test]
    fn parses_explicit_increase_percentage() {
        assert!((parse_scenario_factor("what if volume increases by 20%") - 1.20).abs() < 1e-9);
    }

    #[test]
    fn parses_explicit_decrease_percentage() {
        assert!((parse_scenario_factor("simulate a 15% drop in volume") - 0.85).abs() < 1e-9);
    }

    #[test]
    fn defaults_when_no_magnitude_present() {
        assert!((parse_scenario_factor("what if things change") - 1.10).abs() < 1e-9);
    }

    #[tokio::test]
    async fn projects_baseline_under_parsed_factor() {
        let result = SimulationAgent.run(Uuid::new_v4(), "increase by 50%", &window()).await;
        assert!((result.metrics["projected"].as_f64().unwrap() - 1500.0).abs() < 1e-6);
    }
}
