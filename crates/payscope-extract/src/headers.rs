use std::collections::HashMap;

/// Lowercases, snake-cases, and de-duplicates a raw header row. A header
/// seen twice gets a numeric suffix (`amount`, `amount_2`) so downstream
/// tagging never has to deal with ambiguous column names.
pub fn normalize_headers(raw: &[String]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.iter()
        .map(|h| {
            let base = snake_case(h);
            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                base
            } else {
                format!("{base}_{count}")
            }
        })
        .collect()
}

fn snake_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut prev_was_sep = true;
    for ch in raw.trim().chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            prev_was_sep = false;
        } else if !prev_was_sep {
            out.push('_');
            prev_was_sep = true;
        }
    }
    out.trim_end_matches('_').to_string()
}

/// Scores how likely `row` is to be a header row: fraction of cells that
/// look like labels (alphabetic, no pure numbers, no currency symbols)
/// rather than data.
pub fn header_likelihood_score(row: &[String]) -> f64 {
    if row.is_empty() {
        return 0.0;
    }
    let label_like = row
        .iter()
        .filter(|cell| {
            let trimmed = cell.trim();
            !trimmed.is_empty()
                && trimmed.parse::<f64>().is_err()
                && !trimmed.starts_with(['$', '€', '£'])
                && trimmed.chars().any(|c| c.is_alphabetic())
        })
        .count();
    label_like as f64 / row.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_and_dedupes_headers() {
        let raw = vec!["Transaction ID".to_string(), "Amount".to_string(), "Amount".to_string()];
        let normalized = normalize_headers(&raw);
        assert_eq!(normalized, vec!["transaction_id", "amount", "amount_2"]);
    }

    #[test]
    fn header_row_scores_higher_than_data_row() {
        let header = vec!["Transaction ID".to_string(), "Amount".to_string(), "Currency".to_string()];
        let data = vec!["TX123".to_string(), "10.50".to_string(), "USD".to_string()];
        assert!(header_likelihood_score(&header) > header_likelihood_score(&data));
    }
}
