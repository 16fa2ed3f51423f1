use payscope_core::error::PayScopeError;
use serde::Deserialize;
use tracing::instrument;

use crate::types::{Intent, IntentClassification};

/// Keywords that force an ANOMALY classification regardless of what a
/// model call or the rest of the keyword classifier would pick (spec.md
/// §4.11: "ANOMALY is detected by keyword prior ... which wins over
/// other intents when it matches").
const ANOMALY_KEYWORDS: &[&str] = &["fraud", "anomaly", "suspicious", "spike", "irregular"];

const COMPARE_KEYWORDS: &[&str] = &["compare", "versus", "vs", "reconcile", "difference between"];
const FORECAST_KEYWORDS: &[&str] = &["forecast", "predict", "projection", "next week", "next month"];
const WHAT_IF_KEYWORDS: &[&str] = &["what if", "scenario", "suppose", "hypothetical"];

fn keyword_classify(query: &str) -> IntentClassification {
    let lower = query.to_lowercase();
    if ANOMALY_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return IntentClassification { intent: Intent::Anomaly, confidence: 0.9 };
    }
    if WHAT_IF_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return IntentClassification { intent: Intent::WhatIf, confidence: 0.75 };
    }
    if FORECAST_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return IntentClassification { intent: Intent::Forecast, confidence: 0.75 };
    }
    if COMPARE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return IntentClassification { intent: Intent::Compare, confidence: 0.7 };
    }
    IntentClassification { intent: Intent::Describe, confidence: 0.55 }
}

#[derive(Deserialize)]
struct RawIntentResponse {
    intent: String,
    confidence: f64,
}

fn parse_model_intent(raw: &RawIntentResponse) -> Option<Intent> {
    match raw.intent.to_uppercase().as_str() {
        "DESCRIBE" => Some(Intent::Describe),
        "COMPARE" => Some(Intent::Compare),
        "ANOMALY" => Some(Intent::Anomaly),
        "FORECAST" => Some(Intent::Forecast),
        "WHAT_IF" => Some(Intent::WhatIf),
        _ => None,
    }
}

/// Client for the optional intent-classification model call. Any failure
/// or schema violation here is a soft failure: callers fall back to the
/// keyword classifier rather than erroring the whole chat query.
pub struct IntentModelClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl IntentModelClient {
    pub fn new(client: reqwest::Client, base_url: String, api_key: String, model: String) -> Self {
        Self { client, base_url, api_key, model }
    }

    #[instrument(skip(self, query))]
    async fn classify(&self, query: &str) -> Result<IntentClassification, PayScopeError> {
        #[derive(serde::Serialize)]
        struct ChatMessage<'a> {
            role: &'static str,
            content: &'a str,
        }
        #[derive(serde::Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            temperature: f64,
            top_p: f64,
            messages: Vec<ChatMessage<'a>>,
            response_format: serde_json::Value,
        }
        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }
        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChatResponseMessage,
        }
        #[derive(Deserialize)]
        struct ChatResponseMessage {
            content: String,
        }

        let prompt = format!(
            "Classify this analyst question into one intent: DESCRIBE, COMPARE, ANOMALY, FORECAST, or WHAT_IF.\nQuestion: {query}"
        );
        let request = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            top_p: 1.0,
            messages: vec![ChatMessage { role: "user", content: &prompt }],
            response_format: serde_json::json!({
                "type": "json_schema",
                "json_schema": {
                    "name": "intent_classification",
                    "strict": true,
                    "schema": {
                        "type": "object",
                        "properties": {
                            "intent": {"type": "string", "enum": ["DESCRIBE", "COMPARE", "ANOMALY", "FORECAST", "WHAT_IF"]},
                            "confidence": {"type": "number"}
                        },
                        "required": ["intent", "confidence"]
                    }
                }
            }),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| dependency_error(format!("intent model request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(dependency_error(format!("intent model returned {}", response.status())));
        }

        let decoded: ChatResponse = response
            .json()
            .await
            .map_err(|e| dependency_error(format!("intent model response decode failed: {e}")))?;
        let content = decoded
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| dependency_error("intent model returned no choices"))?;

        let raw: RawIntentResponse =
            serde_json::from_str(&content).map_err(|e| dependency_error(format!("intent model response malformed: {e}")))?;
        let intent = parse_model_intent(&raw).ok_or_else(|| dependency_error("intent model returned an unknown intent"))?;
        Ok(IntentClassification { intent, confidence: raw.confidence })
    }
}

fn dependency_error(detail: impl Into<String>) -> PayScopeError {
    PayScopeError::DependencyUnavailable {
        dependency: "intent_model".to_string(),
        detail: detail.into(),
    }
}

/// `classify_intent(query) -> {intent, confidence}` (spec.md §4.11). The
/// ANOMALY keyword prior is checked first and wins outright; otherwise a
/// model call is tried (if configured) and falls back to the keyword
/// classifier on any error.
#[instrument(skip(query, model_client))]
pub async fn classify_intent(query: &str, model_client: Option<&IntentModelClient>) -> IntentClassification {
    let lower = query.to_lowercase();
    if ANOMALY_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return IntentClassification { intent: Intent::Anomaly, confidence: 0.9 };
    }

    match model_client {
        Some(client) => match client.classify(query).await {
            Ok(classification) => classification,
            Err(e) => {
                tracing::warn!(error = %e, "intent model call failed, falling back to keyword classifier");
                keyword_classify(query)
            }
        },
        None => keyword_classify(query),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn anomaly_keyword_wins_even_without_model() {
        let result = classify_intent("why did fraud spike last week?", None).await;
        assert_eq!(result.intent, Intent::Anomaly);
    }

    #[tokio::test]
    async fn keyword_fallback_detects_forecast() {
        let result = classify_intent("forecast next month's volume", None).await;
        assert_eq!(result.intent, Intent::Forecast);
    }

    #[tokio::test]
    async fn keyword_fallback_defaults_to_describe() {
        let result = classify_intent("tell me about last month", None).await;
        assert_eq!(result.intent, Intent::Describe);
    }

    #[tokio::test]
    async fn anomaly_keyword_wins_over_compare_phrasing() {
        let result = classify_intent("compare this to the suspicious spike last week", None).await;
        assert_eq!(result.intent, Intent::Anomaly);
    }
}
