//! Validator/deduper (C6): primitive, ISO-4217, and timestamp rules for
//! individual rows, plus confidence/recency-ordered dedupe across a whole
//! batch (spec.md §4.6).

pub mod dedupe;
pub mod row;

pub use dedupe::dedupe;
pub use row::{validate_row, RawRow, RowError};
