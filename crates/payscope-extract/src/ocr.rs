use payscope_core::error::PayScopeError;

/// Pluggable OCR backend for `pdf-scanned` artifacts. Deployments wire in
/// a real engine (e.g. a Tesseract or cloud-OCR binding); this crate ships
/// only the trait and a null implementation so the extractor's control
/// flow (per-page failure isolation, confidence propagation) is exercised
/// and testable without a system OCR dependency.
pub trait OcrEngine: Send + Sync {
    /// Recognizes text in a single rasterized page, returning the text and
    /// an overall confidence in `[0, 1]`.
    fn recognize_page(&self, page_image: &[u8]) -> Result<(String, f64), PayScopeError>;
}

/// Always reports failure; used where no OCR backend has been configured.
/// The extractor turns this into a per-page error marker rather than
/// failing the whole artifact (spec.md §4.3).
pub struct NullOcrEngine;

impl OcrEngine for NullOcrEngine {
    fn recognize_page(&self, _page_image: &[u8]) -> Result<(String, f64), PayScopeError> {
        Err(PayScopeError::ExtractionFailed {
            detail: "no OCR engine configured".to_string(),
        })
    }
}
