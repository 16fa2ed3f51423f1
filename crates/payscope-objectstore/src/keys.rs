use uuid::Uuid;

/// `raw/{bank_id}/{artifact_id}/{filename}` — the address of an uploaded
/// artifact's original bytes.
pub fn raw_key(bank_id: Uuid, artifact_id: Uuid, filename: &str) -> String {
    format!("raw/{bank_id}/{artifact_id}/{filename}")
}

/// `extracted/{artifact_id}/intermediate.json` — the extractor's
/// `IntermediateDocument` output.
pub fn extracted_key(artifact_id: Uuid) -> String {
    format!("extracted/{artifact_id}/intermediate.json")
}

/// `normalized/{artifact_id}/transactions.json` — the mapper/validator's
/// canonical transaction batch, prior to persistence fan-out.
pub fn normalized_key(artifact_id: Uuid) -> String {
    format!("normalized/{artifact_id}/transactions.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_deterministic_for_same_inputs() {
        let bank = Uuid::nil();
        let artifact = Uuid::nil();
        assert_eq!(
            raw_key(bank, artifact, "report.csv"),
            raw_key(bank, artifact, "report.csv")
        );
        assert_eq!(
            extracted_key(artifact),
            format!("extracted/{artifact}/intermediate.json")
        );
        assert_eq!(
            normalized_key(artifact),
            format!("normalized/{artifact}/transactions.json")
        );
    }
}
