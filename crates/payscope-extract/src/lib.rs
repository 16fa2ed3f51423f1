//! Extractor (C3): turns a raw artifact's bytes into a normalized
//! `IntermediateDocument`, dispatching on `FileFormat` per spec.md §4.3.

pub mod csv_extractor;
pub mod headers;
pub mod ocr;
pub mod pdf_extractor;
pub mod sniff;
pub mod xlsx_extractor;

use payscope_core::error::PayScopeError;
use payscope_core::model::{FileFormat, IntermediateDocument};
use uuid::Uuid;

use ocr::{NullOcrEngine, OcrEngine};

/// Extracts `bytes` (the contents addressed by `object_key`) according to
/// `file_format`. `page_images`, when the format is `pdf-scanned`, are the
/// rasterized pages to hand to the OCR engine; ignored otherwise.
pub fn extract(
    artifact_id: Uuid,
    object_key: &str,
    file_format: FileFormat,
    bytes: &[u8],
    page_images: &[Vec<u8>],
    ocr_engine: Option<&dyn OcrEngine>,
) -> Result<IntermediateDocument, PayScopeError> {
    match file_format {
        FileFormat::Csv => csv_extractor::extract_csv(artifact_id, object_key, bytes),
        FileFormat::Xlsx => xlsx_extractor::extract_xlsx(artifact_id, object_key, bytes),
        FileFormat::PdfDigital => pdf_extractor::extract_pdf_digital(artifact_id, object_key, bytes),
        FileFormat::PdfScanned => {
            let default_engine = NullOcrEngine;
            let engine = ocr_engine.unwrap_or(&default_engine);
            pdf_extractor::extract_pdf_scanned(artifact_id, object_key, bytes, page_images, engine)
        }
    }
}
