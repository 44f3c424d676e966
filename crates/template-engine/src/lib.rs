//! Template marker parsing and schema construction
//!
//! This crate turns the flattened text of an ODT/DOCX template into a
//! versioned [`Schema`](shared_types::Schema):
//! - `extract`: container checks and the text extraction boundary
//! - `markers`: the single-pass marker scanner
//! - `resolver`: marker attributes to field definitions
//! - `builder`: schema aggregation and the `parse_template` entry point
//! - `legacy`: the derived legacy view

pub mod builder;
pub mod errors;
pub mod extract;
pub mod legacy;
pub mod markers;
pub mod resolver;

pub use builder::{parse_template, parse_text, SchemaBuilder};
pub use errors::ParseFailure;
pub use extract::{open_template, FlattenedTextExtractor, StaticTextExtractor, TextExtractor};
pub use legacy::to_legacy;
pub use markers::{scan_markers, MarkerKind, MarkerScope, TemplateMarker};
pub use resolver::resolve_field;
