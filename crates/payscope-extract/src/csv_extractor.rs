use payscope_core::error::PayScopeError;
use payscope_core::model::{DocumentElement, ElementType, IntermediateDocument, SourceRef};
use uuid::Uuid;

use crate::headers::{header_likelihood_score, normalize_headers};
use crate::sniff::{detect_delimiter, decode_bytes};

/// Turns CSV bytes into an `IntermediateDocument`. One element per data
/// cell, tagged with its normalized header via `source_ref.row_or_page`
/// carrying the original (1-based) row number so a reviewer can trace a
/// canonical value back to its exact source line.
///
/// Malformed rows (wrong column count) are skipped with an error marker
/// element rather than aborting the whole artifact (spec.md §4.3).
pub fn extract_csv(artifact_id: Uuid, object_key: &str, bytes: &[u8]) -> Result<IntermediateDocument, PayScopeError> {
    let text = decode_bytes(bytes);
    let delimiter = detect_delimiter(&text);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = reader.records();
    let header_row = rows
        .next()
        .ok_or_else(|| PayScopeError::ExtractionFailed {
            detail: "csv artifact has no rows".to_string(),
        })?
        .map_err(|e| PayScopeError::ExtractionFailed {
            detail: format!("failed to read header row: {e}"),
        })?;

    let raw_headers: Vec<String> = header_row.iter().map(str::to_string).collect();
    if header_likelihood_score(&raw_headers) < 0.5 {
        tracing::warn!(artifact_id = %artifact_id, "first csv row does not look like a header; proceeding anyway");
    }
    let headers = normalize_headers(&raw_headers);

    let mut elements = Vec::new();
    let mut row_number: i64 = 1;

    for record in rows {
        row_number += 1;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                elements.push(error_marker_element(artifact_id, object_key, row_number, &e.to_string()));
                continue;
            }
        };

        if record.len() != headers.len() {
            elements.push(error_marker_element(
                artifact_id,
                object_key,
                row_number,
                &format!("expected {} columns, got {}", headers.len(), record.len()),
            ));
            continue;
        }

        for (header, value) in headers.iter().zip(record.iter()) {
            elements.push(DocumentElement {
                page: 0,
                element_type: ElementType::Cell,
                text: format!("{header}={value}"),
                bbox: None,
                ocr_confidence: None,
                source_ref: SourceRef {
                    artifact_id,
                    object_key: object_key.to_string(),
                    row_or_page: row_number,
                    sheet_name: None,
                },
            });
        }
    }

    Ok(IntermediateDocument { artifact_id, elements })
}

fn error_marker_element(artifact_id: Uuid, object_key: &str, row_number: i64, detail: &str) -> DocumentElement {
    DocumentElement {
        page: 0,
        element_type: ElementType::Line,
        text: format!("ROW_ERROR: {detail}"),
        bbox: None,
        ocr_confidence: None,
        source_ref: SourceRef {
            artifact_id,
            object_key: object_key.to_string(),
            row_or_page: row_number,
            sheet_name: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_well_formed_csv() {
        let bytes = b"Transaction ID,Amount,Currency\nTX1,10.50,USD\nTX2,20.00,EUR\n";
        let doc = extract_csv(Uuid::new_v4(), "raw/x", bytes).unwrap();
        assert_eq!(doc.elements.len(), 6);
        assert_eq!(doc.elements[0].text, "transaction_id=TX1");
    }

    #[test]
    fn malformed_row_gets_error_marker_not_abort() {
        let bytes = b"a,b,c\n1,2,3\n1,2\n4,5,6\n";
        let doc = extract_csv(Uuid::new_v4(), "raw/x", bytes).unwrap();
        let error_markers: Vec<_> = doc
            .elements
            .iter()
            .filter(|e| e.text.starts_with("ROW_ERROR"))
            .collect();
        assert_eq!(error_markers.len(), 1);
        let non_errors: Vec<_> = doc.elements.iter().filter(|e| !e.text.starts_with("ROW_ERROR")).collect();
        assert_eq!(non_errors.len(), 6);
    }
}
