use payscope_core::model::FieldTag;

/// Fixed per-tag anchor keyword sets standing in for precomputed anchor
/// embeddings. Similarity is token-overlap based rather than a learned
/// embedding, which keeps tagging deterministic and dependency-free while
/// preserving the same contract: each tag has a reference point other
/// text is compared against (spec.md §4.4).
fn anchor_tokens(tag: FieldTag) -> &'static [&'static str] {
    match tag {
        FieldTag::Amount => &["amount", "total", "value", "sum", "balance", "debit", "credit"],
        FieldTag::Currency => &["currency", "ccy", "curr"],
        FieldTag::TransactionId => &["transaction", "txn", "id", "reference", "ref", "trace"],
        FieldTag::Date => &["date", "time", "timestamp", "posted", "processed"],
        FieldTag::Status => &["status", "state", "outcome", "result"],
        FieldTag::None => &[],
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Cosine-like similarity between `text`'s tokens and `tag`'s anchor
/// tokens: `|intersection| / sqrt(|text tokens| * |anchor tokens|)`.
pub fn anchor_similarity(tag: FieldTag, text: &str) -> f64 {
    let anchors = anchor_tokens(tag);
    if anchors.is_empty() {
        return 0.0;
    }
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return 0.0;
    }

    let overlap = tokens.iter().filter(|t| anchors.contains(&t.as_str())).count();
    if overlap == 0 {
        return 0.0;
    }
    (overlap as f64) / ((tokens.len() as f64).sqrt() * (anchors.len() as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_token_matches_its_own_anchor_best() {
        let amount_score = anchor_similarity(FieldTag::Amount, "Total Amount Due");
        let currency_score = anchor_similarity(FieldTag::Currency, "Total Amount Due");
        assert!(amount_score > currency_score);
    }

    #[test]
    fn unrelated_text_scores_zero() {
        assert_eq!(anchor_similarity(FieldTag::Amount, "merchant category code"), 0.0);
    }
}
