//! Layout tagger (C4): assigns semantic field tags to extracted elements
//! by combining anchor-token similarity, a regex prior, and (for OCR'd
//! input) recognition confidence, with a deterministic tie-break.

pub mod anchors;
pub mod regex_prior;
pub mod tag;
pub mod value_profile;

pub use tag::{pick_best, tag_document, TIE_BREAK_EPSILON};
