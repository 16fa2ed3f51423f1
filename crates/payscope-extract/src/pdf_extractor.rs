use payscope_core::error::PayScopeError;
use payscope_core::model::{DocumentElement, ElementType, IntermediateDocument, SourceRef};
use uuid::Uuid;

use crate::ocr::OcrEngine;

/// `pdf-digital`: extracts the embedded text layer page by page, preserving
/// reading order. Confidence is left `None` — a digital text layer has no
/// meaningful recognition confidence (spec.md §4.3).
pub fn extract_pdf_digital(artifact_id: Uuid, object_key: &str, bytes: &[u8]) -> Result<IntermediateDocument, PayScopeError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| PayScopeError::ExtractionFailed {
        detail: format!("failed to extract pdf text layer: {e}"),
    })?;

    let mut elements = Vec::new();
    for (page_index, page_text) in pages.iter().enumerate() {
        for line in page_text.lines().filter(|l| !l.trim().is_empty()) {
            elements.push(DocumentElement {
                page: page_index as i32,
                element_type: ElementType::Text,
                text: line.to_string(),
                bbox: None,
                ocr_confidence: None,
                source_ref: SourceRef {
                    artifact_id,
                    object_key: object_key.to_string(),
                    row_or_page: page_index as i64,
                    sheet_name: None,
                },
            });
        }
    }

    Ok(IntermediateDocument { artifact_id, elements })
}

/// `pdf-scanned`: attempts the embedded text layer first (some "scanned"
/// uploads still carry one from a prior OCR pass by the sender), then
/// falls back to `ocr_engine` per page. A page whose OCR fails continues
/// with an error marker rather than aborting the artifact; confidence and
/// pixel bboxes from the OCR pass are preserved when available.
pub fn extract_pdf_scanned(
    artifact_id: Uuid,
    object_key: &str,
    bytes: &[u8],
    page_images: &[Vec<u8>],
    ocr_engine: &dyn OcrEngine,
) -> Result<IntermediateDocument, PayScopeError> {
    if let Ok(pages) = pdf_extract::extract_text_from_mem_by_pages(bytes) {
        if pages.iter().any(|p| !p.trim().is_empty()) {
            return extract_pdf_digital(artifact_id, object_key, bytes);
        }
    }

    let mut elements = Vec::new();
    for (page_index, page_image) in page_images.iter().enumerate() {
        match ocr_engine.recognize_page(page_image) {
            Ok((text, confidence)) => {
                for line in text.lines().filter(|l| !l.trim().is_empty()) {
                    elements.push(DocumentElement {
                        page: page_index as i32,
                        element_type: ElementType::Line,
                        text: line.to_string(),
                        bbox: None,
                        ocr_confidence: Some(confidence),
                        source_ref: SourceRef {
                            artifact_id,
                            object_key: object_key.to_string(),
                            row_or_page: page_index as i64,
                            sheet_name: None,
                        },
                    });
                }
            }
            Err(e) => elements.push(DocumentElement {
                page: page_index as i32,
                element_type: ElementType::Line,
                text: format!("OCR_ERROR: {e}"),
                bbox: None,
                ocr_confidence: Some(0.0),
                source_ref: SourceRef {
                    artifact_id,
                    object_key: object_key.to_string(),
                    row_or_page: page_index as i64,
                    sheet_name: None,
                },
            }),
        }
    }

    Ok(IntermediateDocument { artifact_id, elements })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::NullOcrEngine;

    #[test]
    fn scanned_pdf_with_no_text_layer_isolates_ocr_failures_per_page() {
        // An invalid/empty PDF byte stream has no text layer, so every
        // configured page image falls through to the OCR engine.
        let doc = extract_pdf_scanned(Uuid::new_v4(), "raw/x", b"%PDF-1.4\n", &[vec![0u8; 4], vec![1u8; 4]], &NullOcrEngine)
            .unwrap();
        assert_eq!(doc.elements.len(), 2);
        assert!(doc.elements.iter().all(|e| e.text.starts_with("OCR_ERROR")));
    }
}
