//! Types shared by the template engine, the content codec and the schema store

pub mod schema;
pub mod slug;
pub mod values;

pub use schema::{
    BlockStyle, DataType, FieldDefinition, FieldKind, Passthrough, RepeaterDefinition, Schema,
    SchemaError, SchemaMeta, SchemaSummary, TemplateType, UiHints, Validation, SCHEMA_VERSION,
};
pub use slug::{humanize_slug, is_valid_slug, sanitize_slug};
pub use values::{LegacyField, LegacyItemField, StructuredFieldValue, ValueKind};
