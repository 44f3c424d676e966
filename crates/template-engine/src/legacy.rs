//! Derive the flattened legacy schema view
//!
//! Older renderers only understand four value types. The legacy view is
//! always computed from the current schema and never stored on its own.

use shared_types::{FieldDefinition, LegacyField, LegacyItemField, Schema, ValueKind};

fn item_field(field: &FieldDefinition) -> LegacyItemField {
    LegacyItemField {
        slug: field.slug().to_string(),
        label: field.label.clone(),
        kind: field.kind.legacy_kind(),
    }
}

/// Convert a v2 schema into the legacy list
///
/// Top-level fields come first in schema order, then one `array` entry per
/// repeater with its nested fields keyed by slug.
pub fn to_legacy(schema: &Schema) -> Vec<LegacyField> {
    let fields = schema.fields().iter().map(|field| LegacyField {
        slug: field.slug().to_string(),
        label: field.label.clone(),
        kind: field.kind.legacy_kind(),
        item_schema: None,
    });

    let repeaters = schema.repeaters().iter().map(|repeater| LegacyField {
        slug: repeater.slug().to_string(),
        label: repeater.label.clone(),
        kind: ValueKind::Array,
        item_schema: Some(
            repeater
                .fields()
                .iter()
                .map(|f| (f.slug().to_string(), item_field(f)))
                .collect(),
        ),
    });

    fields.chain(repeaters).collect()
}
