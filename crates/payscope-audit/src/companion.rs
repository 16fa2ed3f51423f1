use payscope_core::error::PayScopeError;
use payscope_core::model::AuditCompanion;
use tracing::instrument;

fn dependency_error(detail: impl Into<String>) -> PayScopeError {
    PayScopeError::DependencyUnavailable {
        dependency: "audit_ledger".to_string(),
        detail: detail.into(),
    }
}

/// Records an off-chain companion row so an auditor can recompute a hash
/// from source data and compare it against the ledger entry it attests to
/// (spec.md §4.10). Failure here does not roll back the ledger write; a
/// missing companion row degrades auditability, not correctness, so
/// callers treat it as best-effort.
#[instrument(skip(client, companion), fields(ledger_event_id = %companion.ledger_event_id))]
pub async fn record_companion(
    client: &reqwest::Client,
    endpoint: &str,
    companion: &AuditCompanion,
) -> Result<(), PayScopeError> {
    let response = client
        .post(format!("{endpoint}/companion"))
        .json(companion)
        .send()
        .await
        .map_err(|e| dependency_error(format!("record_companion request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(dependency_error(format!(
            "audit ledger returned {} recording companion row",
            response.status()
        )));
    }
    Ok(())
}
