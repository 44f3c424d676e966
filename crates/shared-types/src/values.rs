//! Stored field values and the legacy schema view

use serde::{Deserialize, Serialize};
use indexmap::IndexMap;
use std::fmt;

/// Storage kind of a field value, also the legacy schema type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Single,
    Textarea,
    Rich,
    Array,
}

impl ValueKind {
    /// Parse a stored `type` attribute; anything unrecognized is `None`
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "single" => Some(ValueKind::Single),
            "textarea" => Some(ValueKind::Textarea),
            "rich" => Some(ValueKind::Rich),
            "array" => Some(ValueKind::Array),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Single => "single",
            ValueKind::Textarea => "textarea",
            ValueKind::Rich => "rich",
            ValueKind::Array => "array",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field of a document's structured content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredFieldValue {
    pub slug: String,
    #[serde(rename = "type")]
    pub kind: ValueKind,
    /// Raw value; for `array` a JSON array of item objects
    pub value: String,
}

impl StructuredFieldValue {
    pub fn new(slug: impl Into<String>, kind: ValueKind, value: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            kind,
            value: value.into(),
        }
    }
}

/// Nested field of a legacy `array` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyItemField {
    pub slug: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: ValueKind,
}

/// One entry of the flattened legacy schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyField {
    pub slug: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: ValueKind,
    /// Nested fields keyed by slug, in template order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_schema: Option<IndexMap<String, LegacyItemField>>,
}
