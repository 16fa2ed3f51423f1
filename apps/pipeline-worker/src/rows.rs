//! Bridges the tagger/mapper's column-oriented view of a tabular artifact
//! to the validator's row-oriented `RawRow` (spec.md §4.5/§4.6): groups
//! extracted cells back into source rows and resolves each canonical
//! field to the raw value the mapper's winning header points at.

use std::collections::HashMap;

use payscope_core::model::{DocumentElement, ElementType, FieldTag, IntermediateDocument, SourceRef};
use payscope_mapper::MappingResponse;
use payscope_validate::RawRow;
use uuid::Uuid;

/// The canonical header name a synthesized PDF "row" uses for each
/// `FieldTag` the layout tagger assigns. `None` never gets a header since
/// an untagged element carries no canonical field to resolve.
fn tag_label(tag: FieldTag) -> Option<&'static str> {
    match tag {
        FieldTag::Amount => Some("amount"),
        FieldTag::Currency => Some("currency"),
        FieldTag::TransactionId => Some("transaction_id"),
        FieldTag::Date => Some("date"),
        FieldTag::Status => Some("status"),
        FieldTag::None => None,
    }
}

/// Bridges the layout tagger's per-element `FieldTag` output (spec.md
/// §4.4) to the same `"header=value"` cell convention the CSV/XLSX
/// extractors already use (spec.md §4.3), so a PDF document can flow
/// through `build_sample_rows`/`build_raw_rows` unchanged.
///
/// A document that already has `Cell` elements (CSV/XLSX) is returned
/// untouched; `payscope-tagger`'s per-page scoring only runs for
/// documents that don't, i.e. PDF text/line elements.
pub fn synthesize_tabular_view(document: &IntermediateDocument) -> IntermediateDocument {
    if document.elements.iter().any(|e| e.element_type == ElementType::Cell) {
        return document.clone();
    }

    let tagged = payscope_tagger::tag_document(document);
    let elements = tagged
        .into_iter()
        .filter_map(|tagged_element| {
            let label = tag_label(tagged_element.field_tag)?;
            let source_ref = SourceRef {
                artifact_id: document.artifact_id,
                object_key: tagged_element.element.source_ref.object_key.clone(),
                row_or_page: tagged_element.element.source_ref.row_or_page,
                sheet_name: None,
            };
            Some(DocumentElement {
                page: tagged_element.element.page,
                element_type: ElementType::Cell,
                text: format!("{label}={}", tagged_element.element.text),
                bbox: tagged_element.element.bbox,
                ocr_confidence: tagged_element.element.ocr_confidence,
                source_ref,
            })
        })
        .collect();

    IntermediateDocument {
        artifact_id: document.artifact_id,
        elements,
    }
}

/// Parses the extractor's `"header=value"` cell encoding into the
/// `{header: [sample values]}` view `payscope_mapper::map` expects.
pub fn build_sample_rows(document: &IntermediateDocument) -> HashMap<String, Vec<String>> {
    let mut rows: HashMap<String, Vec<String>> = HashMap::new();
    for element in &document.elements {
        if let Some((header, value)) = element.text.split_once('=') {
            rows.entry(header.to_string()).or_default().push(value.to_string());
        }
    }
    rows
}

/// One source row's `{header: value}` view, keyed by `(row_or_page,
/// sheet_name)` so a multi-sheet xlsx artifact never merges two sheets'
/// rows that happen to share a row number. Preserves first-seen order.
fn group_by_row(document: &IntermediateDocument) -> Vec<((i64, Option<String>), HashMap<String, String>)> {
    let mut order: Vec<(i64, Option<String>)> = Vec::new();
    let mut rows: HashMap<(i64, Option<String>), HashMap<String, String>> = HashMap::new();

    for element in &document.elements {
        let Some((header, value)) = element.text.split_once('=') else {
            continue;
        };
        let key = (element.source_ref.row_or_page, element.source_ref.sheet_name.clone());
        rows.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            HashMap::new()
        });
        rows.get_mut(&key).unwrap().insert(header.to_string(), value.to_string());
    }

    order.into_iter().map(|key| (key.clone(), rows.remove(&key).unwrap_or_default())).collect()
}

/// For each `FieldTag`, the mapped source header with the highest
/// confidence and that confidence. `mapper::map` has already dropped
/// anything below `MAPPING_CONFIDENCE_THRESHOLD`, so every entry here
/// survived that filter; this only resolves ties when two headers were
/// independently mapped to the same canonical field.
fn header_for_tag(mapping: &MappingResponse) -> HashMap<FieldTag, (String, f64)> {
    let mut best: HashMap<FieldTag, (String, f64)> = HashMap::new();
    for field in &mapping.mappings {
        if field.canonical_field == FieldTag::None {
            continue;
        }
        match best.get(&field.canonical_field) {
            Some((_, existing_confidence)) if *existing_confidence >= field.confidence => {}
            _ => {
                best.insert(field.canonical_field, (field.source_field.clone(), field.confidence));
            }
        }
    }
    best
}

/// Header-name heuristics for the two canonical fields the layout tagger
/// never tags (spec.md §4.4's `field_tag` vocabulary stops at {amount,
/// currency, transaction_id, date, status}): merchant identity and card
/// network have no mapper confidence score of their own, so they're
/// resolved directly against the normalized header text instead.
fn find_header_containing<'a>(headers: impl Iterator<Item = &'a String>, needles: &[&str]) -> Option<String> {
    headers.into_iter().find(|h| needles.iter().any(|n| h.contains(n))).cloned()
}

fn looks_like_credit(status: &str) -> bool {
    let lower = status.to_lowercase();
    lower.contains("credit") || lower.contains("refund") || lower.contains("reversal")
}

/// Builds one `RawRow` per extracted source row. `source_network` backs
/// `card_network` when no column plausibly carries it (most single-network
/// report exports, e.g. a Visa authorization file, never repeat the
/// network name per row).
pub fn build_raw_rows(
    document: &IntermediateDocument,
    object_key: &str,
    mapping: &MappingResponse,
    bank_id: Uuid,
    source_network: &str,
    schema_version: &str,
) -> Vec<RawRow> {
    let by_tag = header_for_tag(mapping);
    let required_tags = [FieldTag::TransactionId, FieldTag::Amount, FieldTag::Currency, FieldTag::Date];
    let confidences: Vec<f64> = required_tags.iter().filter_map(|t| by_tag.get(t).map(|(_, c)| *c)).collect();
    let row_confidence = if confidences.is_empty() {
        mapping.lifecycle_confidence
    } else {
        confidences.iter().sum::<f64>() / confidences.len() as f64
    };

    group_by_row(document)
        .into_iter()
        .map(|((row_or_page, _sheet_name), values)| {
            let lookup = |tag: FieldTag| by_tag.get(&tag).and_then(|(header, _)| values.get(header)).cloned();
            let status_text = lookup(FieldTag::Status);

            RawRow {
                transaction_id: lookup(FieldTag::TransactionId),
                amount_raw: lookup(FieldTag::Amount),
                currency_raw: lookup(FieldTag::Currency),
                timestamp_raw: lookup(FieldTag::Date),
                lifecycle_stage: mapping.lifecycle,
                merchant_id: find_header_containing(values.keys(), &["merchant"]).and_then(|h| values.get(&h).cloned()),
                card_network: find_header_containing(values.keys(), &["network", "scheme", "card_network"])
                    .and_then(|h| values.get(&h).cloned())
                    .or_else(|| Some(source_network.to_string())),
                bank_id,
                raw_source_ref: payscope_core::model::RawSourceRef {
                    artifact_id: document.artifact_id,
                    object_key: object_key.to_string(),
                    row_or_page,
                },
                confidence_score: row_confidence,
                schema_version: schema_version.to_string(),
                mapping_source: mapping.mapping_source,
                is_credit: status_text.as_deref().map(looks_like_credit).unwrap_or(false),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use payscope_core::model::{DocumentElement, ElementType, LifecycleStage, MappingSource, SourceRef};
    use payscope_mapper::FieldMapping;

    fn cell(artifact_id: Uuid, row: i64, header: &str, value: &str) -> DocumentElement {
        DocumentElement {
            page: 0,
            element_type: ElementType::Cell,
            text: format!("{header}={value}"),
            bbox: None,
            ocr_confidence: None,
            source_ref: SourceRef {
                artifact_id,
                object_key: "raw/x".to_string(),
                row_or_page: row,
                sheet_name: None,
            },
        }
    }

    fn mapping() -> MappingResponse {
        MappingResponse {
            lifecycle: LifecycleStage::Auth,
            lifecycle_confidence: 0.9,
            mappings: vec![
                FieldMapping { source_field: "transaction_id".to_string(), canonical_field: FieldTag::TransactionId, confidence: 0.95 },
                FieldMapping { source_field: "amount".to_string(), canonical_field: FieldTag::Amount, confidence: 0.9 },
                FieldMapping { source_field: "currency".to_string(), canonical_field: FieldTag::Currency, confidence: 0.85 },
                FieldMapping { source_field: "auth_date".to_string(), canonical_field: FieldTag::Date, confidence: 0.8 },
            ],
            mapping_source: MappingSource::Rule,
        }
    }

    #[test]
    fn groups_two_rows_from_cells() {
        let artifact_id = Uuid::new_v4();
        let elements = vec![
            cell(artifact_id, 2, "transaction_id", "TX1"),
            cell(artifact_id, 2, "amount", "10.00"),
            cell(artifact_id, 2, "currency", "USD"),
            cell(artifact_id, 2, "auth_date", "2026-07-01T00:00:00Z"),
            cell(artifact_id, 3, "transaction_id", "TX2"),
            cell(artifact_id, 3, "amount", "20.00"),
            cell(artifact_id, 3, "currency", "EUR"),
            cell(artifact_id, 3, "auth_date", "2026-07-01T00:00:00Z"),
        ];
        let document = IntermediateDocument { artifact_id, elements };
        let rows = build_raw_rows(&document, "raw/x", &mapping(), Uuid::new_v4(), "VISA", "1.0");
        assert_eq!(rows.len(), 2);
        let tx1 = rows.iter().find(|r| r.transaction_id.as_deref() == Some("TX1")).unwrap();
        assert_eq!(tx1.amount_raw.as_deref(), Some("10.00"));
        assert_eq!(tx1.card_network.as_deref(), Some("VISA"));
    }

    #[test]
    fn tabular_document_passes_through_synthesis_unchanged() {
        let artifact_id = Uuid::new_v4();
        let elements = vec![cell(artifact_id, 2, "transaction_id", "TX1")];
        let document = IntermediateDocument { artifact_id, elements };
        let synthesized = synthesize_tabular_view(&document);
        assert_eq!(synthesized.elements.len(), 1);
        assert_eq!(synthesized.elements[0].text, "transaction_id=TX1");
    }

    #[test]
    fn pdf_text_elements_synthesize_into_tagged_cells() {
        let artifact_id = Uuid::new_v4();
        let elements = vec![
            DocumentElement {
                page: 0,
                element_type: ElementType::Text,
                text: "Transaction ID: TX-99182".to_string(),
                bbox: None,
                ocr_confidence: None,
                source_ref: SourceRef { artifact_id, object_key: "raw/doc.pdf".to_string(), row_or_page: 0, sheet_name: None },
            },
            DocumentElement {
                page: 0,
                element_type: ElementType::Text,
                text: "Amount: 42.50".to_string(),
                bbox: None,
                ocr_confidence: None,
                source_ref: SourceRef { artifact_id, object_key: "raw/doc.pdf".to_string(), row_or_page: 0, sheet_name: None },
            },
        ];
        let document = IntermediateDocument { artifact_id, elements };
        let synthesized = synthesize_tabular_view(&document);
        assert!(synthesized.elements.iter().all(|e| e.element_type == ElementType::Cell));
        let sample_rows = build_sample_rows(&synthesized);
        assert!(sample_rows.contains_key("transaction_id") || sample_rows.contains_key("amount"));
    }

    #[test]
    fn merchant_header_resolved_by_name_not_mapping() {
        let artifact_id = Uuid::new_v4();
        let elements = vec![
            cell(artifact_id, 2, "transaction_id", "TX1"),
            cell(artifact_id, 2, "amount", "10.00"),
            cell(artifact_id, 2, "currency", "USD"),
            cell(artifact_id, 2, "auth_date", "2026-07-01T00:00:00Z"),
            cell(artifact_id, 2, "merchant_name", "Coffee Shop"),
        ];
        let document = IntermediateDocument { artifact_id, elements };
        let rows = build_raw_rows(&document, "raw/x", &mapping(), Uuid::new_v4(), "VISA", "1.0");
        assert_eq!(rows[0].merchant_id.as_deref(), Some("Coffee Shop"));
    }
}
