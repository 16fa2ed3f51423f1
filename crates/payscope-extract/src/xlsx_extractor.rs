use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use payscope_core::error::PayScopeError;
use payscope_core::model::{DocumentElement, ElementType, IntermediateDocument, SourceRef};
use uuid::Uuid;

use crate::headers::{header_likelihood_score, normalize_headers};

/// Turns XLSX bytes into an `IntermediateDocument`, iterating every sheet
/// and treating each as an independent table with its own header row
/// (spec.md §4.3). `sheet_name` is preserved on each element's
/// `source_ref` alongside the row number.
pub fn extract_xlsx(artifact_id: Uuid, object_key: &str, bytes: &[u8]) -> Result<IntermediateDocument, PayScopeError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook: Xlsx<_> = open_workbook_from_rs(cursor).map_err(|e| PayScopeError::ExtractionFailed {
        detail: format!("failed to open xlsx workbook: {e}"),
    })?;

    let sheet_names = workbook.sheet_names().to_owned();
    let mut elements = Vec::new();

    for sheet_name in sheet_names {
        let range = match workbook.worksheet_range(&sheet_name) {
            Ok(range) => range,
            Err(e) => {
                elements.push(sheet_error_element(artifact_id, object_key, &sheet_name, &e.to_string()));
                continue;
            }
        };

        let mut rows = range.rows();
        let Some(header_row) = rows.next() else {
            continue;
        };
        let raw_headers: Vec<String> = header_row.iter().map(cell_to_string).collect();
        if header_likelihood_score(&raw_headers) < 0.3 {
            tracing::warn!(artifact_id = %artifact_id, sheet = %sheet_name, "sheet's first row does not look like a header");
        }
        let headers = normalize_headers(&raw_headers);

        for (row_index, row) in rows.enumerate() {
            let row_number = (row_index + 2) as i64; // 1-based, +1 for the header row already consumed
            if row.len() != headers.len() {
                elements.push(sheet_error_element(
                    artifact_id,
                    object_key,
                    &sheet_name,
                    &format!("row {row_number}: expected {} columns, got {}", headers.len(), row.len()),
                ));
                continue;
            }

            for (header, cell) in headers.iter().zip(row.iter()) {
                elements.push(DocumentElement {
                    page: 0,
                    element_type: ElementType::Cell,
                    text: format!("{header}={}", cell_to_string(cell)),
                    bbox: None,
                    ocr_confidence: None,
                    source_ref: SourceRef {
                        artifact_id,
                        object_key: object_key.to_string(),
                        row_or_page: row_number,
                        sheet_name: Some(sheet_name.clone()),
                    },
                });
            }
        }
    }

    Ok(IntermediateDocument { artifact_id, elements })
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#ERROR:{e:?}"),
    }
}

fn sheet_error_element(artifact_id: Uuid, object_key: &str, sheet_name: &str, detail: &str) -> DocumentElement {
    DocumentElement {
        page: 0,
        element_type: ElementType::Line,
        text: format!("SHEET_ERROR: {detail}"),
        bbox: None,
        ocr_confidence: None,
        source_ref: SourceRef {
            artifact_id,
            object_key: object_key.to_string(),
            row_or_page: 0,
            sheet_name: Some(sheet_name.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_to_string_renders_each_data_variant() {
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::String("VISA".to_string())), "VISA");
        assert_eq!(cell_to_string(&Data::Float(10.5)), "10.5");
        assert_eq!(cell_to_string(&Data::Int(42)), "42");
        assert_eq!(cell_to_string(&Data::Bool(true)), "true");
    }

    #[test]
    fn sheet_error_element_carries_sheet_name_and_detail() {
        let artifact_id = Uuid::new_v4();
        let element = sheet_error_element(artifact_id, "raw/x", "Sheet2", "bad row");
        assert_eq!(element.element_type, ElementType::Line);
        assert!(element.text.contains("bad row"));
        assert_eq!(element.source_ref.sheet_name.as_deref(), Some("Sheet2"));
        assert_eq!(element.source_ref.artifact_id, artifact_id);
    }

    #[test]
    fn extract_xlsx_rejects_non_xlsx_bytes() {
        let err = extract_xlsx(Uuid::new_v4(), "raw/x", b"not an xlsx file").unwrap_err();
        assert_eq!(err.error_class(), "extraction_failed");
    }
}
