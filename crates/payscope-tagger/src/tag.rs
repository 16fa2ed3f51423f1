use payscope_core::model::{DocumentElement, ElementType, FieldTag, IntermediateDocument, LayoutTaggedElement};

use crate::anchors::anchor_similarity;
use crate::regex_prior::regex_match_score;
use crate::value_profile::infer_column_tag;

/// Scores within this margin of the best score are considered tied
/// (spec.md §4.4 tie-break, default ε = 0.03).
pub const TIE_BREAK_EPSILON: f64 = 0.03;

/// Picks the highest-scoring `(tag, score)` pair, breaking ties within
/// `TIE_BREAK_EPSILON` of the maximum by `FieldTag::tie_break_rank`
/// (transaction_id > date > amount > currency > status) so repeated runs
/// over the same input always choose the same tag.
pub fn pick_best(scored: Vec<(FieldTag, f64)>) -> (FieldTag, f64) {
    let Some(&(_, max_score)) = scored
        .iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    else {
        return (FieldTag::None, 0.0);
    };

    scored
        .into_iter()
        .filter(|(_, score)| max_score - score <= TIE_BREAK_EPSILON)
        .min_by_key(|(tag, _)| tag.tie_break_rank())
        .unwrap_or((FieldTag::None, 0.0))
}

/// Monotone combination of cosine-style anchor similarity, regex match,
/// and OCR confidence into one final tag confidence for a PDF element
/// (spec.md §4.4). Weights sum to 1; `ocr_confidence` defaults to 1.0 for
/// non-OCR'd elements (a digital text layer has nothing to discount by).
fn pdf_element_score(tag: FieldTag, element: &DocumentElement) -> f64 {
    let anchor = anchor_similarity(tag, &element.text);
    let regex = regex_match_score(tag, element.text.trim());
    let ocr = element.ocr_confidence.unwrap_or(1.0);
    0.4 * anchor + 0.4 * regex + 0.2 * ocr
}

fn tag_pdf_element(element: &DocumentElement) -> LayoutTaggedElement {
    let candidates = [
        FieldTag::Amount,
        FieldTag::Currency,
        FieldTag::TransactionId,
        FieldTag::Date,
        FieldTag::Status,
    ];
    let scored: Vec<(FieldTag, f64)> = candidates.iter().map(|&tag| (tag, pdf_element_score(tag, element))).collect();
    let (field_tag, tag_confidence) = pick_best(scored);
    LayoutTaggedElement {
        element: element.clone(),
        field_tag,
        tag_confidence,
    }
}

/// `tag(IntermediateDocument) -> [LayoutTaggedElement]` (spec.md §4.4).
/// Dispatches per element: `Cell` elements (CSV/XLSX) are inferred
/// per-column from header + value profile; everything else (PDF text/
/// line/table elements) is scored individually against the anchor/regex/
/// OCR combination.
pub fn tag_document(document: &IntermediateDocument) -> Vec<LayoutTaggedElement> {
    let cell_elements: Vec<&DocumentElement> = document
        .elements
        .iter()
        .filter(|e| e.element_type == ElementType::Cell)
        .collect();

    if cell_elements.is_empty() {
        return document.elements.iter().map(tag_pdf_element).collect();
    }

    tag_tabular_elements(&cell_elements, &document.elements)
}

fn tag_tabular_elements(cells: &[&DocumentElement], all_elements: &[DocumentElement]) -> Vec<LayoutTaggedElement> {
    use std::collections::HashMap;

    // Cells are encoded as "header=value" by the extractor; group samples
    // by header to build each column's value-population profile.
    let mut columns: HashMap<String, Vec<String>> = HashMap::new();
    for cell in cells {
        if let Some((header, value)) = cell.text.split_once('=') {
            columns.entry(header.to_string()).or_default().push(value.to_string());
        }
    }

    let mut column_tags: HashMap<String, (FieldTag, f64)> = HashMap::new();
    for (header, values) in &columns {
        let sample: Vec<&str> = values.iter().map(String::as_str).take(50).collect();
        column_tags.insert(header.clone(), infer_column_tag(header, &sample));
    }

    all_elements
        .iter()
        .map(|element| {
            if element.element_type != ElementType::Cell {
                return LayoutTaggedElement {
                    element: element.clone(),
                    field_tag: FieldTag::None,
                    tag_confidence: 0.0,
                };
            }
            let header = element.text.split_once('=').map(|(h, _)| h).unwrap_or("");
            let (field_tag, tag_confidence) = column_tags.get(header).copied().unwrap_or((FieldTag::None, 0.0));
            LayoutTaggedElement {
                element: element.clone(),
                field_tag,
                tag_confidence,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tie_break_prefers_transaction_id_over_date_within_epsilon() {
        let scored = vec![(FieldTag::Date, 0.80), (FieldTag::TransactionId, 0.79)];
        let (tag, _) = pick_best(scored);
        assert_eq!(tag, FieldTag::TransactionId);
    }

    #[test]
    fn no_tie_break_when_scores_differ_beyond_epsilon() {
        let scored = vec![(FieldTag::Date, 0.90), (FieldTag::TransactionId, 0.50)];
        let (tag, _) = pick_best(scored);
        assert_eq!(tag, FieldTag::Date);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_field_tag() -> impl Strategy<Value = FieldTag> {
        prop_oneof![
            Just(FieldTag::Amount),
            Just(FieldTag::Currency),
            Just(FieldTag::TransactionId),
            Just(FieldTag::Date),
            Just(FieldTag::Status),
        ]
    }

    fn arb_scored() -> impl Strategy<Value = Vec<(FieldTag, f64)>> {
        prop::collection::vec((arb_field_tag(), 0.0f64..1.0), 1..6)
    }

    proptest! {
        /// Reproducibility (spec.md §4.4): the same scored candidates, in
        /// any order, always resolve to the same winning tag.
        #[test]
        fn pick_best_is_order_independent(scored in arb_scored()) {
            let forward = pick_best(scored.clone());
            let mut reversed = scored;
            reversed.reverse();
            let backward = pick_best(reversed);
            prop_assert_eq!(forward.0, backward.0);
        }

        /// The winner is always either the outright best score, or a tag
        /// within `TIE_BREAK_EPSILON` of it that outranks every other
        /// candidate inside that margin — never a tag clearly beaten by
        /// more than the tie-break margin.
        #[test]
        fn pick_best_never_returns_a_clear_loser(scored in arb_scored()) {
            let max_score = scored.iter().map(|(_, s)| *s).fold(f64::MIN, f64::max);
            let (winner_tag, _) = pick_best(scored.clone());
            let winner_within_margin = scored
                .iter()
                .any(|(tag, score)| *tag == winner_tag && max_score - score <= TIE_BREAK_EPSILON);
            prop_assert!(winner_within_margin);
        }
    }
}
