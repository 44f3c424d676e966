//! Field markers found in template text
//!
//! A marker looks like `[slug;key='value';key=value]`. Dotted slugs
//! (`items.title`) belong to the repeater named before the dot, and the
//! `block` attribute turns a marker into a repeater delimiter:
//!
//! - `block=begin` / `block=end` open and close a free-standing block
//! - `block=tbs:row` makes the enclosing table row the repeat unit

mod scanner;

pub use scanner::scan_markers;

use serde::Serialize;

/// Which schema node a marker contributes to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", content = "repeater", rename_all = "kebab-case")]
pub enum MarkerScope {
    TopLevel,
    Repeater(String),
    TableRow(String),
}

impl MarkerScope {
    /// Repeater name for nested scopes
    pub fn repeater(&self) -> Option<&str> {
        match self {
            MarkerScope::TopLevel => None,
            MarkerScope::Repeater(name) | MarkerScope::TableRow(name) => Some(name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// Declares a fillable field
    Field,
    /// Opens (or, for table rows, declares) a repeater
    BlockBegin,
    /// Closes a free-standing repeater
    BlockEnd,
}

/// A well-formed marker in encounter order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateMarker {
    /// Slug exactly as written, possibly dotted
    pub slug: String,
    /// Attributes in source order, keys lowercased
    pub attributes: Vec<(String, String)>,
    pub scope: MarkerScope,
    pub kind: MarkerKind,
    /// Byte offset of the opening bracket
    pub offset: usize,
}

impl TemplateMarker {
    /// Attribute value by key; a repeated key resolves to its last occurrence
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The field part of the slug (`title` for `items.title`)
    pub fn field_name(&self) -> &str {
        match self.slug.split_once('.') {
            Some((_, rest)) => rest,
            None => &self.slug,
        }
    }
}
