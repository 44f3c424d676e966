//! Versioned template schema: scalar fields plus repeating item groups

use crate::slug::{humanize_slug, is_valid_slug};
use crate::values::ValueKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Current schema version written by the builder
pub const SCHEMA_VERSION: u32 = 2;

/// Invariant violations raised by the schema constructors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Invalid slug: '{0}'")]
    InvalidSlug(String),

    #[error("Duplicate slug: '{0}'")]
    DuplicateSlug(String),
}

/// Semantic kind of a fillable field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Textarea,
    Html,
    Number,
    Date,
    Email,
    Url,
}

impl FieldKind {
    /// Map a marker `type` attribute to a kind; unknown names fall back to textarea
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "text" => FieldKind::Text,
            "textarea" => FieldKind::Textarea,
            "html" => FieldKind::Html,
            "number" => FieldKind::Number,
            "date" => FieldKind::Date,
            "email" => FieldKind::Email,
            "url" => FieldKind::Url,
            _ => FieldKind::Textarea,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Textarea => "textarea",
            FieldKind::Html => "html",
            FieldKind::Number => "number",
            FieldKind::Date => "date",
            FieldKind::Email => "email",
            FieldKind::Url => "url",
        }
    }

    /// Coarse data type used for value normalization and bound checks
    pub fn data_type(&self) -> DataType {
        match self {
            FieldKind::Number => DataType::Number,
            FieldKind::Date => DataType::Date,
            FieldKind::Text
            | FieldKind::Textarea
            | FieldKind::Html
            | FieldKind::Email
            | FieldKind::Url => DataType::Text,
        }
    }

    /// Collapse to the legacy three-way view: html -> rich, textarea -> textarea, rest -> single
    pub fn legacy_kind(&self) -> ValueKind {
        match self {
            FieldKind::Html => ValueKind::Rich,
            FieldKind::Textarea => ValueKind::Textarea,
            FieldKind::Text
            | FieldKind::Number
            | FieldKind::Date
            | FieldKind::Email
            | FieldKind::Url => ValueKind::Single,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Text,
    Number,
    Boolean,
    Date,
}

/// Value constraints declared on a marker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Validation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(
        rename = "patternmsg",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub pattern_message: Option<String>,
    #[serde(rename = "minvalue", default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<String>,
    #[serde(rename = "maxvalue", default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<String>,
    /// Maximum number of characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
}

impl Validation {
    pub fn is_empty(&self) -> bool {
        self.pattern.is_none()
            && self.min_value.is_none()
            && self.max_value.is_none()
            && self.length.is_none()
    }
}

/// Editing hints shown next to the input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Renderer-only attributes carried through untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passthrough {
    /// Case transform (`ope`)
    #[serde(rename = "ope", default, skip_serializing_if = "Option::is_none")]
    pub case_transform: Option<String>,
    /// Date display format (`frm`)
    #[serde(rename = "frm", default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
}

/// A single fillable field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    slug: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub data_type: DataType,
    #[serde(flatten)]
    pub hints: UiHints,
    #[serde(flatten)]
    pub validation: Validation,
    #[serde(flatten)]
    pub passthrough: Passthrough,
}

impl FieldDefinition {
    /// Create a field; the slug must already be in the safe-key alphabet
    pub fn new(slug: impl Into<String>, kind: FieldKind) -> Result<Self, SchemaError> {
        let slug = slug.into();
        if !is_valid_slug(&slug) {
            return Err(SchemaError::InvalidSlug(slug));
        }
        Ok(Self {
            label: humanize_slug(&slug),
            slug,
            kind,
            data_type: kind.data_type(),
            hints: UiHints::default(),
            validation: Validation::default(),
            passthrough: Passthrough::default(),
        })
    }

    /// Set the label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }
}

/// How a repeater is laid out in the template
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockStyle {
    /// Delimited by `block=begin` / `block=end`
    #[default]
    FreeBlock,
    /// The enclosing table row repeats (`block=tbs:row`)
    TableRow,
}

/// A variable-length list of structurally identical items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeaterDefinition {
    slug: String,
    pub label: String,
    #[serde(default)]
    pub block: BlockStyle,
    #[serde(default)]
    fields: Vec<FieldDefinition>,
}

impl RepeaterDefinition {
    pub fn new(slug: impl Into<String>, block: BlockStyle) -> Result<Self, SchemaError> {
        let slug = slug.into();
        if !is_valid_slug(&slug) {
            return Err(SchemaError::InvalidSlug(slug));
        }
        Ok(Self {
            label: humanize_slug(&slug),
            slug,
            block,
            fields: Vec::new(),
        })
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn field(&self, slug: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.slug == slug)
    }

    /// Append a nested field, rejecting a slug already present in this repeater
    pub fn push_field(&mut self, field: FieldDefinition) -> Result<(), SchemaError> {
        if self.field(&field.slug).is_some() {
            return Err(SchemaError::DuplicateSlug(field.slug));
        }
        self.fields.push(field);
        Ok(())
    }
}

/// Container format of the source template
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateType {
    #[serde(rename = "docx")]
    Docx,
    #[serde(rename = "odt")]
    Odt,
    #[default]
    #[serde(rename = "")]
    Unknown,
}

impl TemplateType {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "docx" => TemplateType::Docx,
            "odt" => TemplateType::Odt,
            _ => TemplateType::Unknown,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateType::Docx => "docx",
            TemplateType::Odt => "odt",
            TemplateType::Unknown => "",
        }
    }
}

/// Where a schema came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaMeta {
    pub template_type: TemplateType,
    pub template_id: String,
    pub parsed_at: DateTime<Utc>,
}

impl SchemaMeta {
    pub fn new(template_type: TemplateType, template_id: impl Into<String>) -> Self {
        Self {
            template_type,
            template_id: template_id.into(),
            parsed_at: Utc::now(),
        }
    }
}

/// Digest of a schema for listing screens
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSummary {
    /// Number of top-level fields
    pub field_count: usize,
    pub repeater_names: Vec<String>,
}

/// The fillable structure of one template
///
/// Top-level field slugs and repeater slugs share one namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub version: u32,
    #[serde(default)]
    fields: Vec<FieldDefinition>,
    #[serde(default)]
    repeaters: Vec<RepeaterDefinition>,
    pub meta: SchemaMeta,
}

impl Schema {
    /// An empty schema at the current version
    pub fn new(meta: SchemaMeta) -> Self {
        Self {
            version: SCHEMA_VERSION,
            fields: Vec::new(),
            repeaters: Vec::new(),
            meta,
        }
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn repeaters(&self) -> &[RepeaterDefinition] {
        &self.repeaters
    }

    pub fn field(&self, slug: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.slug == slug)
    }

    pub fn repeater(&self, slug: &str) -> Option<&RepeaterDefinition> {
        self.repeaters.iter().find(|r| r.slug == slug)
    }

    /// True if a top-level field or repeater uses `slug`
    pub fn contains_slug(&self, slug: &str) -> bool {
        self.field(slug).is_some() || self.repeater(slug).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.repeaters.is_empty()
    }

    pub fn add_field(&mut self, field: FieldDefinition) -> Result<(), SchemaError> {
        if self.contains_slug(&field.slug) {
            return Err(SchemaError::DuplicateSlug(field.slug));
        }
        self.fields.push(field);
        Ok(())
    }

    pub fn add_repeater(&mut self, repeater: RepeaterDefinition) -> Result<(), SchemaError> {
        if self.contains_slug(&repeater.slug) {
            return Err(SchemaError::DuplicateSlug(repeater.slug));
        }
        self.repeaters.push(repeater);
        Ok(())
    }

    pub fn summary(&self) -> SchemaSummary {
        SchemaSummary {
            field_count: self.fields.len(),
            repeater_names: self.repeaters.iter().map(|r| r.slug.clone()).collect(),
        }
    }

    /// Re-check slug invariants on a schema that did not come through the
    /// constructors (e.g. deserialized from storage)
    pub fn check(&self) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        let top = self
            .fields
            .iter()
            .map(|f| f.slug.as_str())
            .chain(self.repeaters.iter().map(|r| r.slug.as_str()));
        for slug in top {
            if !is_valid_slug(slug) {
                return Err(SchemaError::InvalidSlug(slug.to_string()));
            }
            if !seen.insert(slug) {
                return Err(SchemaError::DuplicateSlug(slug.to_string()));
            }
        }

        for repeater in &self.repeaters {
            let mut nested = HashSet::new();
            for field in &repeater.fields {
                if !is_valid_slug(&field.slug) {
                    return Err(SchemaError::InvalidSlug(field.slug.clone()));
                }
                if !nested.insert(field.slug.as_str()) {
                    return Err(SchemaError::DuplicateSlug(field.slug.clone()));
                }
            }
        }

        Ok(())
    }
}
