use std::sync::OnceLock;

use payscope_core::model::FieldTag;
use regex::Regex;

struct FieldPattern {
    tag: FieldTag,
    pattern: &'static str,
}

const PATTERNS: &[FieldPattern] = &[
    FieldPattern {
        tag: FieldTag::Amount,
        pattern: r"^[+-]?[$€£]?\s?\d{1,3}(?:[,.\s]\d{3})*(?:[.,]\d{1,4})?$",
    },
    FieldPattern {
        tag: FieldTag::Currency,
        pattern: r"^[A-Za-z]{3}$",
    },
    FieldPattern {
        tag: FieldTag::TransactionId,
        pattern: r"^[A-Za-z0-9][A-Za-z0-9_-]{5,}$",
    },
    FieldPattern {
        tag: FieldTag::Date,
        pattern: r"^\d{4}-\d{2}-\d{2}([T ]\d{2}:\d{2}(:\d{2})?(Z|[+-]\d{2}:?\d{2})?)?$",
    },
    FieldPattern {
        tag: FieldTag::Status,
        pattern: r"(?i)^(auth(orized)?|cleared|settled|disputed|declined|pending|failed)$",
    },
];

struct CompiledPatterns(Vec<(FieldTag, Regex)>);

fn compiled() -> &'static CompiledPatterns {
    static CELL: OnceLock<CompiledPatterns> = OnceLock::new();
    CELL.get_or_init(|| {
        CompiledPatterns(
            PATTERNS
                .iter()
                .map(|p| (p.tag, Regex::new(p.pattern).expect("field pattern is a valid regex")))
                .collect(),
        )
    })
}

/// Returns `1.0` if `text` matches the regex prior for `tag`, `0.0`
/// otherwise. One of the three signals combined into the tagger's final
/// confidence (spec.md §4.4).
pub fn regex_match_score(tag: FieldTag, text: &str) -> f64 {
    let trimmed = text.trim();
    compiled()
        .0
        .iter()
        .find(|(t, _)| *t == tag)
        .map(|(_, re)| if re.is_match(trimmed) { 1.0 } else { 0.0 })
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_pattern_matches_currency_formatted_numbers() {
        assert_eq!(regex_match_score(FieldTag::Amount, "$1,234.56"), 1.0);
        assert_eq!(regex_match_score(FieldTag::Amount, "1234.56"), 1.0);
        assert_eq!(regex_match_score(FieldTag::Amount, "not a number"), 0.0);
    }

    #[test]
    fn currency_pattern_matches_three_letter_codes() {
        assert_eq!(regex_match_score(FieldTag::Currency, "USD"), 1.0);
        assert_eq!(regex_match_score(FieldTag::Currency, "US"), 0.0);
    }

    #[test]
    fn date_pattern_matches_iso8601() {
        assert_eq!(regex_match_score(FieldTag::Date, "2026-07-27"), 1.0);
        assert_eq!(regex_match_score(FieldTag::Date, "2026-07-27T10:00:00Z"), 1.0);
        assert_eq!(regex_match_score(FieldTag::Date, "07/27/2026"), 0.0);
    }
}
