use std::collections::HashMap;

use payscope_core::model::{CanonicalTransaction, LifecycleStage};

/// `dedupe(rows)` (spec.md §4.6): groups by `(transaction_id,
/// lifecycle_stage)` and keeps the row with the highest
/// `confidence_score`; ties broken by earliest `timestamp_utc`.
///
/// Idempotent: every group already collapses to one row, so re-running
/// `dedupe` on its own output regroups each surviving row with itself and
/// returns it unchanged (`dedupe(dedupe(rows)) == dedupe(rows)`).
pub fn dedupe(rows: Vec<CanonicalTransaction>) -> Vec<CanonicalTransaction> {
    let mut best: HashMap<(String, LifecycleStage), CanonicalTransaction> = HashMap::new();

    for row in rows {
        let key = (row.transaction_id.clone(), row.lifecycle_stage);
        match best.get(&key) {
            None => {
                best.insert(key, row);
            }
            Some(existing) => {
                if is_better(&row, existing) {
                    best.insert(key, row);
                }
            }
        }
    }

    best.into_values().collect()
}

/// Whether `candidate` should replace `current` as the survivor of their
/// shared `(transaction_id, lifecycle_stage)` group.
fn is_better(candidate: &CanonicalTransaction, current: &CanonicalTransaction) -> bool {
    if candidate.confidence_score != current.confidence_score {
        return candidate.confidence_score > current.confidence_score;
    }
    candidate.timestamp_utc < current.timestamp_utc
}

#[cfg(test)]
mod tests {
    use super::*;
    use payscope_core::model::{MappingSource, RawSourceRef};
    use uuid::Uuid;

    fn txn(id: &str, stage: LifecycleStage, confidence: f64, minute: u32) -> CanonicalTransaction {
        CanonicalTransaction {
            transaction_id: id.to_string(),
            amount: rust_decimal::Decimal::new(1000, 2),
            currency: "USD".to_string(),
            timestamp_utc: chrono::Utc::now()
                .with_minute(minute)
                .unwrap()
                .with_second(0)
                .unwrap()
                .with_nanosecond(0)
                .unwrap(),
            lifecycle_stage: stage,
            merchant_id: "M1".to_string(),
            card_network: "VISA".to_string(),
            bank_id: Uuid::new_v4(),
            raw_source_ref: RawSourceRef {
                artifact_id: Uuid::new_v4(),
                object_key: "raw/x".to_string(),
                row_or_page: 1,
            },
            confidence_score: confidence,
            schema_version: "1.0".to_string(),
            mapping_source: MappingSource::Rule,
        }
    }

    use chrono::Timelike;

    #[test]
    fn keeps_highest_confidence_row_in_each_group() {
        let rows = vec![
            txn("TX1", LifecycleStage::Auth, 0.6, 0),
            txn("TX1", LifecycleStage::Auth, 0.9, 1),
            txn("TX2", LifecycleStage::Auth, 0.5, 0),
        ];
        let deduped = dedupe(rows);
        assert_eq!(deduped.len(), 2);
        let tx1 = deduped.iter().find(|t| t.transaction_id == "TX1").unwrap();
        assert_eq!(tx1.confidence_score, 0.9);
    }

    #[test]
    fn ties_broken_by_earliest_timestamp() {
        let rows = vec![
            txn("TX1", LifecycleStage::Auth, 0.9, 30),
            txn("TX1", LifecycleStage::Auth, 0.9, 5),
        ];
        let deduped = dedupe(rows);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].timestamp_utc.minute(), 5);
    }

    #[test]
    fn different_lifecycle_stages_are_not_merged() {
        let rows = vec![
            txn("TX1", LifecycleStage::Auth, 0.9, 0),
            txn("TX1", LifecycleStage::Clearing, 0.9, 0),
        ];
        assert_eq!(dedupe(rows).len(), 2);
    }

    #[test]
    fn dedupe_is_idempotent() {
        let rows = vec![
            txn("TX1", LifecycleStage::Auth, 0.6, 0),
            txn("TX1", LifecycleStage::Auth, 0.9, 1),
            txn("TX2", LifecycleStage::Settlement, 0.5, 0),
        ];
        let once = dedupe(rows);
        let mut twice = dedupe(once.clone());
        let mut once_sorted = once;
        once_sorted.sort_by(|a, b| a.transaction_id.cmp(&b.transaction_id));
        twice.sort_by(|a, b| a.transaction_id.cmp(&b.transaction_id));
        assert_eq!(once_sorted.len(), twice.len());
        for (a, b) in once_sorted.iter().zip(twice.iter()) {
            assert_eq!(a.transaction_id, b.transaction_id);
            assert_eq!(a.confidence_score, b.confidence_score);
        }
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use chrono::Timelike;
    use payscope_core::model::{MappingSource, RawSourceRef};
    use proptest::prelude::*;
    use uuid::Uuid;

    fn arb_stage() -> impl Strategy<Value = LifecycleStage> {
        prop_oneof![
            Just(LifecycleStage::Auth),
            Just(LifecycleStage::Clearing),
            Just(LifecycleStage::Settlement),
        ]
    }

    prop_compose! {
        fn arb_txn()(
            // Small alphabet so generated rows collide into the same
            // `(transaction_id, lifecycle_stage)` group often, which is
            // what exercises the dedupe/tie-break logic.
            id in "[A-C]",
            stage in arb_stage(),
            confidence_millis in 0u32..1000,
            minute in 0u32..59,
        ) -> CanonicalTransaction {
            CanonicalTransaction {
                transaction_id: id,
                amount: rust_decimal::Decimal::new(1000, 2),
                currency: "USD".to_string(),
                timestamp_utc: chrono::Utc::now().with_minute(minute).unwrap().with_second(0).unwrap().with_nanosecond(0).unwrap(),
                lifecycle_stage: stage,
                merchant_id: "M1".to_string(),
                card_network: "VISA".to_string(),
                bank_id: Uuid::new_v4(),
                raw_source_ref: RawSourceRef {
                    artifact_id: Uuid::new_v4(),
                    object_key: "raw/x".to_string(),
                    row_or_page: 1,
                },
                confidence_score: confidence_millis as f64 / 1000.0,
                schema_version: "1.0".to_string(),
                mapping_source: MappingSource::Rule,
            }
        }
    }

    proptest! {
        /// `dedupe(dedupe(rows)) == dedupe(rows)` (spec.md §8) for any
        /// batch of transactions, regardless of how many groups collide.
        #[test]
        fn dedupe_is_idempotent_over_random_batches(rows in prop::collection::vec(arb_txn(), 0..20)) {
            fn sortable_key(t: &CanonicalTransaction) -> (Uuid, String, u8, String, u64) {
                let (bank_id, transaction_id, stage, schema_version) = t.dedupe_key();
                (bank_id, transaction_id, stage.ordinal(), schema_version, t.confidence_score.to_bits())
            }

            let once = dedupe(rows);
            let mut once_keys: Vec<_> = once.iter().map(sortable_key).collect();
            let mut twice_keys: Vec<_> = dedupe(once).iter().map(sortable_key).collect();
            once_keys.sort();
            twice_keys.sort();
            prop_assert_eq!(once_keys, twice_keys);
        }

        /// Every surviving row's group has no other row in the input with
        /// strictly higher confidence (or, on a confidence tie, an earlier
        /// timestamp) — i.e. `dedupe` always keeps an actual maximum.
        #[test]
        fn survivor_is_never_dominated(rows in prop::collection::vec(arb_txn(), 1..20)) {
            let survivors = dedupe(rows.clone());
            for survivor in &survivors {
                let better_exists = rows.iter().any(|r| {
                    r.transaction_id == survivor.transaction_id
                        && r.lifecycle_stage == survivor.lifecycle_stage
                        && is_better(r, survivor)
                });
                prop_assert!(!better_exists);
            }
        }
    }
}
