use payscope_core::error::PayScopeError;
use payscope_core::model::LifecycleStage;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

fn dependency_error(detail: impl Into<String>) -> PayScopeError {
    PayScopeError::DependencyUnavailable {
        dependency: "vector_store".to_string(),
        detail: detail.into(),
    }
}

/// Metadata every vector record must carry, per invariant 5. A query
/// issued without a `bank_id` filter is a contract violation and this
/// client refuses to build one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorMetadata {
    pub report_id: Uuid,
    pub transaction_pk: Uuid,
    pub lifecycle_stage: LifecycleStage,
    pub source_type: String,
    pub bank_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorMatch {
    pub vector_id: String,
    pub score: f64,
    pub metadata: VectorMetadata,
}

/// Vector store client (C2): an HTTP-backed similarity index, namespaced
/// per tenant and metadata-filtered as a second, belt-and-suspenders
/// isolation layer.
pub struct VectorStore {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    index: String,
    namespace: String,
}

impl VectorStore {
    pub fn new(client: reqwest::Client, endpoint: String, api_key: String, index: String, namespace: String) -> Self {
        Self {
            client,
            endpoint,
            api_key,
            index,
            namespace,
        }
    }

    pub async fn upsert(&self, vector_id: &str, embedding: &[f32], metadata: &VectorMetadata) -> Result<(), PayScopeError> {
        let response = self
            .client
            .post(format!("{}/indexes/{}/vectors", self.endpoint, self.index))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "id": vector_id,
                "namespace": self.namespace,
                "values": embedding,
                "metadata": metadata,
            }))
            .send()
            .await
            .map_err(|e| dependency_error(format!("upsert failed: {e}")))?;

        if !response.status().is_success() {
            return Err(dependency_error(format!("vector store returned {}", response.status())));
        }
        Ok(())
    }

    /// Similarity query scoped to `bank_id` and, optionally,
    /// `lifecycle_stage`. Refuses to issue a request without `bank_id` set,
    /// matching invariant 5 in code rather than only in documentation.
    pub async fn query_similar(
        &self,
        bank_id: Uuid,
        lifecycle_stage: Option<LifecycleStage>,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorMatch>, PayScopeError> {
        let mut filter = json!({ "bank_id": { "$eq": bank_id } });
        if let Some(stage) = lifecycle_stage {
            filter["lifecycle_stage"] = json!({ "$eq": stage });
        }

        let response = self
            .client
            .post(format!("{}/indexes/{}/query", self.endpoint, self.index))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "namespace": self.namespace,
                "vector": embedding,
                "topK": top_k,
                "filter": filter,
                "includeMetadata": true,
            }))
            .send()
            .await
            .map_err(|e| dependency_error(format!("query failed: {e}")))?;

        if !response.status().is_success() {
            return Err(dependency_error(format!("vector store returned {}", response.status())));
        }

        #[derive(Deserialize)]
        struct QueryResponse {
            matches: Vec<VectorMatch>,
        }

        let decoded: QueryResponse = response
            .json()
            .await
            .map_err(|e| dependency_error(format!("query response decode failed: {e}")))?;
        Ok(decoded.matches)
    }

    pub async fn record_count(&self, bank_id: Uuid) -> Result<i64, PayScopeError> {
        let response = self
            .client
            .get(format!("{}/indexes/{}/describe", self.endpoint, self.index))
            .bearer_auth(&self.api_key)
            .query(&[("namespace", self.namespace.as_str()), ("bank_id", &bank_id.to_string())])
            .send()
            .await
            .map_err(|e| dependency_error(format!("describe failed: {e}")))?;

        if !response.status().is_success() {
            return Err(dependency_error(format!("vector store returned {}", response.status())));
        }

        #[derive(Deserialize)]
        struct DescribeResponse {
            count: i64,
        }
        let decoded: DescribeResponse = response
            .json()
            .await
            .map_err(|e| dependency_error(format!("describe response decode failed: {e}")))?;
        Ok(decoded.count)
    }
}
