use payscope_core::canonical_json;
use payscope_core::error::PayScopeError;
use payscope_core::model::AuditEvent;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

fn dependency_error(detail: impl Into<String>) -> PayScopeError {
    PayScopeError::DependencyUnavailable {
        dependency: "audit_ledger".to_string(),
        detail: detail.into(),
    }
}

#[derive(Serialize)]
struct PutEventRequest<'a> {
    event: &'a AuditEvent,
    payload_hash: String,
}

#[derive(Deserialize)]
struct PutEventResponse {
    tx_id: Uuid,
}

/// Audit ledger client (C10). The ledger is an external append-only
/// service keyed by `event:{event_id}`; this client computes the canonical
/// hash client-side so the ledger only ever has to compare strings.
pub struct AuditLedgerClient {
    client: reqwest::Client,
    endpoint: String,
}

impl AuditLedgerClient {
    pub fn new(client: reqwest::Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }

    /// Appends `event` attesting to `payload`. `event.artifact_hash` must
    /// already equal `canonical_json::hash(payload)`; this is checked here
    /// so a caller can't accidentally ship a mismatched attestation.
    ///
    /// Idempotency: a redelivery with the same `event_id` and an unchanged
    /// payload hash returns the original `tx_id`; a redelivery whose hash
    /// differs is rejected with `idempotency_violation` (invariant 6).
    #[instrument(skip(self, payload), fields(event_id = %event.event_id))]
    pub async fn put_event<T: Serialize>(&self, event: &AuditEvent, payload: &T) -> Result<Uuid, PayScopeError> {
        if !event.is_well_formed() {
            return Err(PayScopeError::ValidationRowFailed {
                detail: format!("audit event {} is not well-formed", event.event_id),
            });
        }

        let computed_hash = canonical_json::hash(payload).map_err(|e| PayScopeError::Internal {
            detail: format!("failed to canonicalize audit payload: {e}"),
        })?;
        if computed_hash != event.artifact_hash {
            return Err(PayScopeError::ValidationRowFailed {
                detail: format!(
                    "event {} artifact_hash {} does not match computed hash {computed_hash}",
                    event.event_id, event.artifact_hash
                ),
            });
        }

        let response = self
            .client
            .put(format!("{}/event/{}", self.endpoint, event.event_id))
            .json(&PutEventRequest {
                event,
                payload_hash: computed_hash,
            })
            .send()
            .await
            .map_err(|e| dependency_error(format!("put_event request failed: {e}")))?;

        match response.status().as_u16() {
            200 | 201 => {
                let decoded: PutEventResponse = response
                    .json()
                    .await
                    .map_err(|e| dependency_error(format!("put_event response decode failed: {e}")))?;
                Ok(decoded.tx_id)
            }
            409 => Err(PayScopeError::IdempotencyViolation {
                event_id: event.event_id,
            }),
            status => Err(dependency_error(format!("audit ledger returned {status}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payscope_core::model::EventType;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_event(hash: &str) -> AuditEvent {
        AuditEvent {
            event_id: Uuid::new_v4(),
            event_type: EventType::Ingest,
            artifact_hash: hash.to_string(),
            schema_version: "1.0".to_string(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn put_event_returns_tx_id_on_success() {
        let server = MockServer::start().await;
        let tx_id = Uuid::new_v4();
        Mock::given(method("PUT"))
            .and(path_regex(r"^/event/.*"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "tx_id": tx_id })))
            .mount(&server)
            .await;

        let payload = serde_json::json!({ "amount": "10.00" });
        let hash = canonical_json::hash(&payload).unwrap();
        let event = make_event(&hash);

        let client = AuditLedgerClient::new(reqwest::Client::new(), server.uri());
        let returned = client.put_event(&event, &payload).await.unwrap();
        assert_eq!(returned, tx_id);
    }

    #[tokio::test]
    async fn hash_mismatch_is_rejected_before_any_request() {
        let event = make_event("0".repeat(64).as_str());
        let payload = serde_json::json!({ "amount": "10.00" });
        let client = AuditLedgerClient::new(reqwest::Client::new(), "http://unused.invalid".to_string());
        let err = client.put_event(&event, &payload).await.unwrap_err();
        assert_eq!(err.error_class(), "validation_row_failed");
    }

    #[tokio::test]
    async fn server_conflict_maps_to_idempotency_violation() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/event/.*"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let payload = serde_json::json!({ "amount": "10.00" });
        let hash = canonical_json::hash(&payload).unwrap();
        let event = make_event(&hash);

        let client = AuditLedgerClient::new(reqwest::Client::new(), server.uri());
        let err = client.put_event(&event, &payload).await.unwrap_err();
        assert_eq!(err.error_class(), "idempotency_violation");
    }
}
