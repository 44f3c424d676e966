//! Structured content storage for filled-in template fields
//!
//! - `blob`: the marker-delimited text blob holding every field value
//! - `array`: JSON encoding of repeater items
//! - `sanitize`: per-kind cleanup before storage
//! - `validation`: declared constraints checked on submit
//! - `merge`: full rebuild of a document's values on save

pub mod array;
pub mod blob;
pub mod error;
pub mod merge;
pub mod sanitize;
pub mod validation;

pub use array::{decode_items, encode_items, repair_unicode_escapes, truncate_items, Item};
pub use blob::{decode, encode};
pub use error::CodecError;
pub use merge::{rebuild, save_document, MergeOutcome, SavedDocument, Submission};
pub use sanitize::{sanitize_value, strip_unsafe_markup, CodecOptions, MAX_ARRAY_ITEMS};
pub use validation::{normalize, validate, validate_with, PatternCache, ValidationMismatch};
