use payscope_core::error::PayScopeError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::instrument;

use crate::types::MappingResponse;

fn dependency_error(detail: impl Into<String>) -> PayScopeError {
    PayScopeError::DependencyUnavailable {
        dependency: "mapper_model".to_string(),
        detail: detail.into(),
    }
}

/// Strict JSON schema the model must answer in (spec.md §4.5: "the model
/// contract is a strict JSON schema"). Field names mirror `MappingResponse`
/// minus `mapping_source`, which this client fills in itself.
fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "lifecycle": {"type": "string", "enum": ["AUTH", "CLEARING", "SETTLEMENT"]},
            "lifecycle_confidence": {"type": "number"},
            "mappings": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "source_field": {"type": "string"},
                        "canonical_field": {
                            "type": "string",
                            "enum": ["amount", "currency", "transaction_id", "date", "status", "none"]
                        },
                        "confidence": {"type": "number"}
                    },
                    "required": ["source_field", "canonical_field", "confidence"]
                }
            }
        },
        "required": ["lifecycle", "lifecycle_confidence", "mappings"]
    })
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f64,
    top_p: f64,
    messages: Vec<ChatMessage>,
    response_format: serde_json::Value,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
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

/// What the model is contractually required to answer with, before this
/// client stamps `mapping_source = model` on it.
#[derive(Deserialize)]
struct RawMappingResponse {
    lifecycle: payscope_core::model::LifecycleStage,
    lifecycle_confidence: f64,
    mappings: Vec<crate::types::FieldMapping>,
}

/// Client for the semantic mapper's model call (spec.md §4.5). Decoding
/// parameters are fixed to a deterministic setting: temperature 0, nucleus
/// cutoff 1. Callers treat any failure here as a trigger to fall back to
/// `rule_fallback`, never as a reason to retry the model itself.
pub struct MapperModelClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl MapperModelClient {
    pub fn new(client: reqwest::Client, base_url: String, api_key: String, model: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
            model,
        }
    }

    fn build_prompt(sample_rows: &HashMap<String, Vec<String>>) -> String {
        let mut lines = vec![
            "You map raw payment report columns onto a canonical schema.".to_string(),
            "Respond with JSON matching the provided schema exactly; no prose.".to_string(),
            "Columns and sample values:".to_string(),
        ];
        for (header, values) in sample_rows {
            let sample = values.iter().take(5).cloned().collect::<Vec<_>>().join(", ");
            lines.push(format!("- {header}: [{sample}]"));
        }
        lines.join("\n")
    }

    /// Issues the mapping model call and parses its strict-schema response.
    /// A schema violation in the model's output is a soft failure: it is
    /// surfaced as an error so the caller falls back to the rule-based
    /// classifier rather than persisting a malformed mapping.
    #[instrument(skip(self, sample_rows))]
    pub async fn map_fields(
        &self,
        sample_rows: &HashMap<String, Vec<String>>,
    ) -> Result<MappingResponse, PayScopeError> {
        let request = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            top_p: 1.0,
            messages: vec![ChatMessage {
                role: "user",
                content: Self::build_prompt(sample_rows),
            }],
            response_format: serde_json::json!({
                "type": "json_schema",
                "json_schema": {"name": "mapping_response", "schema": response_schema(), "strict": true}
            }),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| dependency_error(format!("model request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(dependency_error(format!("mapper model returned {}", response.status())));
        }

        let decoded: ChatResponse = response
            .json()
            .await
            .map_err(|e| dependency_error(format!("model response decode failed: {e}")))?;

        let content = decoded
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| dependency_error("model returned no choices"))?;

        let raw: RawMappingResponse = serde_json::from_str(&content).map_err(|e| PayScopeError::ValidationRowFailed {
            detail: format!("model response violated mapping schema: {e}"),
        })?;

        Ok(MappingResponse {
            lifecycle: raw.lifecycle,
            lifecycle_confidence: raw.lifecycle_confidence,
            mappings: raw.mappings,
            mapping_source: payscope_core::model::MappingSource::Model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_rows() -> HashMap<String, Vec<String>> {
        let mut rows = HashMap::new();
        rows.insert("amount".to_string(), vec!["10.00".to_string()]);
        rows
    }

    #[tokio::test]
    async fn parses_well_formed_model_response() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "lifecycle": "AUTH",
            "lifecycle_confidence": 0.92,
            "mappings": [{"source_field": "amount", "canonical_field": "amount", "confidence": 0.95}]
        });
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": body.to_string()}}]
            })))
            .mount(&server)
            .await;

        let client = MapperModelClient::new(reqwest::Client::new(), server.uri(), "key".to_string(), "m".to_string());
        let result = client.map_fields(&sample_rows()).await.unwrap();
        assert_eq!(result.lifecycle_confidence, 0.92);
        assert_eq!(result.mapping_source, payscope_core::model::MappingSource::Model);
    }

    #[tokio::test]
    async fn malformed_model_content_is_validation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "not json"}}]
            })))
            .mount(&server)
            .await;

        let client = MapperModelClient::new(reqwest::Client::new(), server.uri(), "key".to_string(), "m".to_string());
        let err = client.map_fields(&sample_rows()).await.unwrap_err();
        assert_eq!(err.error_class(), "validation_row_failed");
    }

    #[tokio::test]
    async fn dependency_unavailable_on_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = MapperModelClient::new(reqwest::Client::new(), server.uri(), "key".to_string(), "m".to_string());
        let err = client.map_fields(&sample_rows()).await.unwrap_err();
        assert_eq!(err.error_class(), "dependency_unavailable");
    }
}
