use payscope_core::error::PayScopeError;
use serde::Deserialize;
use tracing::instrument;

fn dependency_error(detail: impl Into<String>) -> PayScopeError {
    PayScopeError::DependencyUnavailable {
        dependency: "embedding_model".to_string(),
        detail: detail.into(),
    }
}

/// Client for the query-embedding model call. Per spec.md's non-goals,
/// PayScope does not implement an embedding model itself — this is a
/// thin client against one, used only to turn a chat query into the
/// vector the retrieval fetch queries the vector store with.
pub struct EmbeddingClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl EmbeddingClient {
    pub fn new(client: reqwest::Client, base_url: String, api_key: String, model: String) -> Self {
        Self { client, base_url, api_key, model }
    }

    #[instrument(skip(self, text))]
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, PayScopeError> {
        #[derive(serde::Serialize)]
        struct EmbeddingRequest<'a> {
            model: &'a str,
            input: &'a str,
        }
        #[derive(Deserialize)]
        struct EmbeddingResponse {
            data: Vec<EmbeddingDatum>,
        }
        #[derive(Deserialize)]
        struct EmbeddingDatum {
            embedding: Vec<f32>,
        }

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest { model: &self.model, input: text })
            .send()
            .await
            .map_err(|e| dependency_error(format!("embedding request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(dependency_error(format!("embedding model returned {}", response.status())));
        }

        let decoded: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| dependency_error(format!("embedding response decode failed: {e}")))?;
        decoded
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| dependency_error("embedding model returned no data"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn parses_well_formed_embedding_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [0.1, 0.2, 0.3]}]
            })))
            .mount(&server)
            .await;

        let client = EmbeddingClient::new(reqwest::Client::new(), server.uri(), "key".to_string(), "m".to_string());
        let vector = client.embed("why did fraud spike").await.unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn non_success_status_is_dependency_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = EmbeddingClient::new(reqwest::Client::new(), server.uri(), "key".to_string(), "m".to_string());
        let err = client.embed("query").await.unwrap_err();
        assert_eq!(err.error_class(), "dependency_unavailable");
    }
}
