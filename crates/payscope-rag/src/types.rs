use serde::{Deserialize, Serialize};

/// The query intents `classify_intent` distinguishes (spec.md §4.11).
/// Re-exported from `payscope-agents`, which owns the intent-to-agent
/// routing table; this crate only classifies into it.
pub use payscope_agents::Intent;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntentClassification {
    pub intent: Intent,
    pub confidence: f64,
}

/// `compose(results) -> StructuredResponse` output (spec.md §4.11).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredResponse {
    pub summary: String,
    pub metrics: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast: Option<serde_json::Value>,
    pub confidence: f64,
    pub intent: IntentLabel,
    pub agents_invoked: Vec<String>,
}

/// `Intent` serialized as its spec.md wire name (`"ANOMALY"`, not
/// `"Anomaly"`); kept as a distinct wrapper rather than putting
/// `Serialize` on `payscope_agents::Intent` itself, since that crate has
/// no API-surface concerns of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentLabel {
    Describe,
    Compare,
    Anomaly,
    Forecast,
    WhatIf,
}

impl From<Intent> for IntentLabel {
    fn from(intent: Intent) -> Self {
        match intent {
            Intent::Describe => IntentLabel::Describe,
            Intent::Compare => IntentLabel::Compare,
            Intent::Anomaly => IntentLabel::Anomaly,
            Intent::Forecast => IntentLabel::Forecast,
            Intent::WhatIf => IntentLabel::WhatIf,
        }
    }
}
