use chrono::{DateTime, Utc};
use payscope_core::model::{CanonicalTransaction, LifecycleStage, MappingSource, RawSourceRef};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Raw, still-stringy row handed to the validator after semantic mapping.
/// Every field is `Option<String>`/raw text because at this point we only
/// know "this is the text the mapper assigned to this canonical field",
/// not that it parses.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub transaction_id: Option<String>,
    pub amount_raw: Option<String>,
    pub currency_raw: Option<String>,
    pub timestamp_raw: Option<String>,
    pub lifecycle_stage: LifecycleStage,
    pub merchant_id: Option<String>,
    pub card_network: Option<String>,
    pub bank_id: Uuid,
    pub raw_source_ref: RawSourceRef,
    pub confidence_score: f64,
    pub schema_version: String,
    pub mapping_source: MappingSource,
    /// Whether the source row was tagged as a credit/reversal entry. A
    /// negative amount is only accepted when this is set (spec.md §8
    /// boundary behaviors): absent that signal, a negative amount is
    /// almost always a sign-parsing bug, not a real credit.
    pub is_credit: bool,
}

/// Structured per-row validation failure (spec.md §4.6). Not a job
/// failure: `payscope-validate` callers count these against
/// `CanonicalReport.record_count` and drop the row, per the "yes on
/// ingestion side" resolution of the open question in `spec.md` §9.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowError {
    pub row_or_page: i64,
    pub field: String,
    pub detail: String,
}

fn row_error(raw: &RawRow, field: &str, detail: impl Into<String>) -> RowError {
    RowError {
        row_or_page: raw.raw_source_ref.row_or_page,
        field: field.to_string(),
        detail: detail.into(),
    }
}

/// Rounds `amount` to six fractional digits using banker's rounding
/// (round-half-to-even), per `spec.md` §4.6 numeric semantics.
fn round_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(6, RoundingStrategy::MidpointNearestEven)
}

/// Parses an RFC-3339 timestamp and converts it to UTC. Timezone-less
/// inputs are rejected outright: `spec.md` §4.6 requires timestamps
/// normalized to UTC, which is meaningless without an explicit offset.
fn parse_utc_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `validate_row(raw) -> CanonicalTransaction | RowError` (spec.md §4.6).
/// Hard-fails on invalid amount, invalid currency, or an unparseable
/// timestamp; also hard-fails on a missing `transaction_id`, `merchant_id`,
/// or `card_network` since `CanonicalTransaction` has no optional slot for
/// any of them.
pub fn validate_row(raw: RawRow) -> Result<CanonicalTransaction, RowError> {
    let transaction_id = raw
        .transaction_id
        .clone()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| row_error(&raw, "transaction_id", "missing or empty transaction_id"))?;

    let merchant_id = raw
        .merchant_id
        .clone()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| row_error(&raw, "merchant_id", "missing or empty merchant_id"))?;

    let card_network = raw
        .card_network
        .clone()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| row_error(&raw, "card_network", "missing or empty card_network"))?;

    let amount_raw = raw
        .amount_raw
        .as_deref()
        .ok_or_else(|| row_error(&raw, "amount", "missing amount"))?;
    // `Decimal` has no NaN/Inf representation, so invariant 7's "never
    // NaN/Inf" is satisfied by construction once this parse succeeds.
    let parsed_amount: Decimal = amount_raw
        .trim()
        .replace(',', "")
        .parse()
        .map_err(|_| row_error(&raw, "amount", format!("unparseable amount: {amount_raw}")))?;
    if parsed_amount.is_sign_negative() && !raw.is_credit {
        return Err(row_error(
            &raw,
            "amount",
            "negative amount without a credit/reversal marker",
        ));
    }
    let amount = round_amount(parsed_amount);

    let currency_raw = raw
        .currency_raw
        .as_deref()
        .ok_or_else(|| row_error(&raw, "currency", "missing currency"))?;
    let currency = payscope_core::iso4217::normalize_currency(currency_raw)
        .ok_or_else(|| row_error(&raw, "currency", format!("currency not in ISO-4217 allowlist: {currency_raw}")))?;

    let timestamp_raw = raw
        .timestamp_raw
        .as_deref()
        .ok_or_else(|| row_error(&raw, "timestamp", "missing timestamp"))?;
    let timestamp_utc = parse_utc_timestamp(timestamp_raw)
        .ok_or_else(|| row_error(&raw, "timestamp", format!("unparseable or tz-less timestamp: {timestamp_raw}")))?;

    Ok(CanonicalTransaction {
        transaction_id,
        amount,
        currency,
        timestamp_utc,
        lifecycle_stage: raw.lifecycle_stage,
        merchant_id,
        card_network,
        bank_id: raw.bank_id,
        raw_source_ref: raw.raw_source_ref,
        confidence_score: raw.confidence_score,
        schema_version: raw.schema_version,
        mapping_source: raw.mapping_source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_raw() -> RawRow {
        RawRow {
            transaction_id: Some("TX1".to_string()),
            amount_raw: Some("10.00".to_string()),
            currency_raw: Some("usd".to_string()),
            timestamp_raw: Some("2026-07-01T12:00:00Z".to_string()),
            lifecycle_stage: LifecycleStage::Auth,
            merchant_id: Some("M1".to_string()),
            card_network: Some("VISA".to_string()),
            bank_id: Uuid::new_v4(),
            raw_source_ref: RawSourceRef {
                artifact_id: Uuid::new_v4(),
                object_key: "raw/x".to_string(),
                row_or_page: 2,
            },
            confidence_score: 0.9,
            schema_version: "1.0".to_string(),
            mapping_source: MappingSource::Rule,
            is_credit: false,
        }
    }

    #[test]
    fn validates_well_formed_row() {
        let txn = validate_row(base_raw()).unwrap();
        assert_eq!(txn.currency, "USD");
        assert_eq!(txn.amount, Decimal::new(1000, 2));
    }

    #[test]
    fn zero_amount_is_accepted() {
        let mut raw = base_raw();
        raw.amount_raw = Some("0".to_string());
        assert!(validate_row(raw).is_ok());
    }

    #[test]
    fn negative_amount_rejected_without_credit_marker() {
        let mut raw = base_raw();
        raw.amount_raw = Some("-10.00".to_string());
        let err = validate_row(raw).unwrap_err();
        assert_eq!(err.field, "amount");
    }

    #[test]
    fn negative_amount_accepted_with_credit_marker() {
        let mut raw = base_raw();
        raw.amount_raw = Some("-10.00".to_string());
        raw.is_credit = true;
        assert!(validate_row(raw).is_ok());
    }

    #[test]
    fn unknown_currency_is_rejected() {
        let mut raw = base_raw();
        raw.currency_raw = Some("XXX".to_string());
        let err = validate_row(raw).unwrap_err();
        assert_eq!(err.field, "currency");
    }

    #[test]
    fn timezone_less_timestamp_is_rejected() {
        let mut raw = base_raw();
        raw.timestamp_raw = Some("2026-07-01T12:00:00".to_string());
        let err = validate_row(raw).unwrap_err();
        assert_eq!(err.field, "timestamp");
    }

    #[test]
    fn amount_rounds_to_six_fractional_digits_bankers_rounding() {
        let mut raw = base_raw();
        raw.amount_raw = Some("10.1234565".to_string());
        let txn = validate_row(raw).unwrap();
        assert_eq!(txn.amount, Decimal::new(10123456, 6));
    }
}
