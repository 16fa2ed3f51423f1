use payscope_core::model::FieldTag;

use crate::regex_prior::regex_match_score;

/// Scores a column's values against `tag` by the fraction that match the
/// tag's regex prior — the "value-population profile" signal for tabular
/// inputs (spec.md §4.4), complementing the header-token match.
pub fn value_population_score(tag: FieldTag, sample_values: &[&str]) -> f64 {
    if sample_values.is_empty() {
        return 0.0;
    }
    let matches = sample_values.iter().filter(|v| regex_match_score(tag, v) > 0.0).count();
    matches as f64 / sample_values.len() as f64
}

/// Aggregates per-row predictions for one column into a single confidence
/// by averaging the value-population score across `FieldTag` candidates'
/// regex priors and returning the best-scoring tag with its score.
pub fn infer_column_tag(header: &str, sample_values: &[&str]) -> (FieldTag, f64) {
    use crate::anchors::anchor_similarity;

    let candidates = [
        FieldTag::Amount,
        FieldTag::Currency,
        FieldTag::TransactionId,
        FieldTag::Date,
        FieldTag::Status,
    ];

    let scored: Vec<(FieldTag, f64)> = candidates
        .into_iter()
        .map(|tag| {
            let header_score = anchor_similarity(tag, header);
            let value_score = value_population_score(tag, sample_values);
            (tag, 0.5 * header_score + 0.5 * value_score)
        })
        .collect();

    crate::tag::pick_best(scored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_column_is_recognized_by_values_alone() {
        let (tag, score) = infer_column_tag("col_3", &["$10.00", "$25.50", "$8.99"]);
        assert_eq!(tag, FieldTag::Amount);
        assert!(score > 0.0);
    }

    #[test]
    fn empty_column_infers_none_with_zero_confidence() {
        let (tag, score) = infer_column_tag("notes", &[]);
        assert_eq!(tag, FieldTag::None);
        assert_eq!(score, 0.0);
    }
}
