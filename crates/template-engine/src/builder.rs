//! Aggregate resolved markers into a versioned schema

use crate::errors::ParseFailure;
use crate::extract::{open_template, TextExtractor};
use crate::markers::{scan_markers, MarkerKind, MarkerScope, TemplateMarker};
use crate::resolver::resolve_field;
use shared_types::{
    sanitize_slug, BlockStyle, RepeaterDefinition, Schema, SchemaMeta, TemplateType,
};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Claim {
    Field,
    Repeater(usize),
}

/// Turns a marker list into a [`Schema`]
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    template_type: TemplateType,
    template_id: String,
}

impl SchemaBuilder {
    pub fn new(template_type: TemplateType, template_id: impl Into<String>) -> Self {
        Self {
            template_type,
            template_id: template_id.into(),
        }
    }

    /// Build a schema; a template without markers yields an empty schema
    ///
    /// Fields keep encounter order, repeaters keep the order of their first
    /// marker. Invalid or duplicate slugs are dropped.
    pub fn build(&self, markers: &[TemplateMarker]) -> Schema {
        let mut fields = Vec::new();
        let mut repeaters: Vec<RepeaterDefinition> = Vec::new();
        let mut claims: HashMap<String, Claim> = HashMap::new();

        for marker in markers {
            match (&marker.kind, &marker.scope) {
                (MarkerKind::BlockEnd, _) => {}
                (MarkerKind::BlockBegin, scope) => {
                    let (name, style) = match scope {
                        MarkerScope::TableRow(name) => (name.as_str(), BlockStyle::TableRow),
                        _ => (
                            marker.slug.split('.').next().unwrap_or_default(),
                            BlockStyle::FreeBlock,
                        ),
                    };
                    if let Some(idx) = repeater_index(&mut repeaters, &mut claims, name, style) {
                        if let Some(title) = marker.attribute("title").filter(|t| !t.is_empty()) {
                            repeaters[idx].label = title.to_string();
                        }
                    }
                }
                (MarkerKind::Field, MarkerScope::TopLevel) => {
                    let Some(slug) = sanitize_slug(&marker.slug) else {
                        debug!(slug = %marker.slug, "dropping field with unusable slug");
                        continue;
                    };
                    if claims.contains_key(&slug) {
                        debug!(%slug, "dropping duplicate field");
                        continue;
                    }
                    match resolve_field(marker, &slug) {
                        Ok(field) => {
                            claims.insert(slug, Claim::Field);
                            fields.push(field);
                        }
                        Err(e) => debug!(error = %e, "dropping field"),
                    }
                }
                (
                    MarkerKind::Field,
                    MarkerScope::Repeater(name) | MarkerScope::TableRow(name),
                ) => {
                    let style = match marker.scope {
                        MarkerScope::TableRow(_) => BlockStyle::TableRow,
                        _ => BlockStyle::FreeBlock,
                    };
                    let Some(idx) = repeater_index(&mut repeaters, &mut claims, name, style) else {
                        continue;
                    };
                    let Some(slug) = sanitize_slug(marker.field_name()) else {
                        debug!(slug = %marker.slug, "dropping nested field with unusable slug");
                        continue;
                    };
                    let result =
                        resolve_field(marker, &slug).and_then(|f| repeaters[idx].push_field(f));
                    if let Err(e) = result {
                        debug!(repeater = %name, error = %e, "dropping nested field");
                    }
                }
            }
        }

        let mut schema = Schema::new(SchemaMeta::new(self.template_type, &self.template_id));
        for field in fields {
            if let Err(e) = schema.add_field(field) {
                debug!(error = %e, "dropping field");
            }
        }
        for repeater in repeaters {
            if let Err(e) = schema.add_repeater(repeater) {
                debug!(error = %e, "dropping repeater");
            }
        }
        schema
    }
}

/// Index of the repeater called `raw_name`, creating it on first sight
///
/// Returns `None` if the name is unusable or already taken by a top-level
/// field. A table-row marker upgrades the block style of an existing repeater.
fn repeater_index(
    repeaters: &mut Vec<RepeaterDefinition>,
    claims: &mut HashMap<String, Claim>,
    raw_name: &str,
    style: BlockStyle,
) -> Option<usize> {
    let Some(slug) = sanitize_slug(raw_name) else {
        debug!(name = raw_name, "dropping repeater with unusable slug");
        return None;
    };

    match claims.get(&slug) {
        Some(Claim::Repeater(idx)) => {
            let idx = *idx;
            if style == BlockStyle::TableRow {
                repeaters[idx].block = BlockStyle::TableRow;
            }
            Some(idx)
        }
        Some(Claim::Field) => {
            debug!(%slug, "repeater name already used by a field");
            None
        }
        None => {
            let repeater = RepeaterDefinition::new(slug.clone(), style).ok()?;
            repeaters.push(repeater);
            let idx = repeaters.len() - 1;
            claims.insert(slug, Claim::Repeater(idx));
            Some(idx)
        }
    }
}

/// Build a schema straight from flattened template text
pub fn parse_text(text: &str, template_type: TemplateType, template_id: &str) -> Schema {
    let markers = scan_markers(text);
    SchemaBuilder::new(template_type, template_id).build(&markers)
}

/// Read a template file and build its schema
///
/// A template without markers yields an empty schema.
///
/// # Arguments
///
/// * `path` - the `.docx` or `.odt` template
/// * `extractor` - turns the container into flattened text
/// * `template_id` - recorded in the schema metadata
///
/// # Errors
///
/// - [`ParseFailure::Unreadable`] if the file cannot be opened
/// - [`ParseFailure::UnsupportedFormat`] or [`ParseFailure::NotAContainer`]
///   if it is not a docx or odt archive
/// - [`ParseFailure::Extraction`] if the extractor fails
pub fn parse_template(
    path: &Path,
    extractor: &dyn TextExtractor,
    template_id: &str,
) -> Result<Schema, ParseFailure> {
    let template_type = open_template(path)?;
    let text = extractor.extract(path, template_type)?;
    let schema = parse_text(&text, template_type, template_id);

    info!(
        template = %path.display(),
        fields = schema.fields().len(),
        repeaters = schema.repeaters().len(),
        "Parsed template schema"
    );

    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::StaticTextExtractor;
    use pretty_assertions::assert_eq;
    use shared_types::{FieldKind, SCHEMA_VERSION};
    use std::io::Write;

    fn build(text: &str) -> Schema {
        parse_text(text, TemplateType::Docx, "tpl-7")
    }

    #[test]
    fn test_single_top_level_field() {
        let schema = build("[name;type='text';title='Full name']");
        assert_eq!(schema.fields().len(), 1);
        let field = &schema.fields()[0];
        assert_eq!(field.slug(), "name");
        assert_eq!(field.kind, FieldKind::Text);
        assert_eq!(field.label, "Full name");
        assert!(schema.repeaters().is_empty());
    }

    #[test]
    fn test_free_block_repeater() {
        let schema = build(
            "[items;block=begin][items.title;type='text'][items.content;type='html'][items;block=end]",
        );
        assert!(schema.fields().is_empty());
        assert_eq!(schema.repeaters().len(), 1);
        let repeater = &schema.repeaters()[0];
        assert_eq!(repeater.slug(), "items");
        assert_eq!(repeater.block, BlockStyle::FreeBlock);
        let nested: Vec<(&str, FieldKind)> = repeater
            .fields()
            .iter()
            .map(|f| (f.slug(), f.kind))
            .collect();
        assert_eq!(
            nested,
            vec![("title", FieldKind::Text), ("content", FieldKind::Html)]
        );
    }

    #[test]
    fn test_table_row_repeater() {
        let schema = build("[rows.item;block=tbs:row;type='text'] [rows.price;type='number']");
        let repeater = schema.repeater("rows").unwrap();
        assert_eq!(repeater.block, BlockStyle::TableRow);
        assert_eq!(repeater.fields().len(), 2);
    }

    #[test]
    fn test_meta_and_version() {
        let schema = build("");
        assert_eq!(schema.version, SCHEMA_VERSION);
        assert_eq!(schema.meta.template_type, TemplateType::Docx);
        assert_eq!(schema.meta.template_id, "tpl-7");
        assert!(schema.is_empty());
    }

    #[test]
    fn test_slugs_are_sanitized_and_deduplicated() {
        let schema = build("[Client_Name;type='text'] [client_name;type='html'] [...]");
        assert_eq!(schema.fields().len(), 1);
        assert_eq!(schema.fields()[0].slug(), "client_name");
        assert_eq!(schema.fields()[0].kind, FieldKind::Text);
    }

    #[test]
    fn test_field_and_repeater_share_namespace() {
        let schema = build("[items;type='text'] [items.title]");
        assert_eq!(schema.fields().len(), 1);
        assert!(schema.repeaters().is_empty());
    }

    #[test]
    fn test_repeater_title_from_begin_marker() {
        let schema = build("[lines;block=begin;title='Order lines'][lines.sku][lines;block=end]");
        assert_eq!(schema.repeater("lines").unwrap().label, "Order lines");
    }

    #[test]
    fn test_empty_block_declares_repeater() {
        let schema = build("[notes;block=begin][notes;block=end]");
        assert_eq!(schema.repeaters().len(), 1);
        assert!(schema.repeaters()[0].fields().is_empty());
    }

    #[test]
    fn test_parse_template_reads_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("offer.odt");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"PK\x03\x04....")
            .unwrap();

        let extractor = StaticTextExtractor::new("[price;type='number']");
        let schema = parse_template(&path, &extractor, "offer").unwrap();
        assert_eq!(schema.meta.template_type, TemplateType::Odt);
        assert_eq!(schema.fields()[0].slug(), "price");
    }

    #[test]
    fn test_parse_template_unreadable() {
        let extractor = StaticTextExtractor::new("[x]");
        let result = parse_template(Path::new("/nonexistent/offer.docx"), &extractor, "offer");
        assert!(matches!(result, Err(ParseFailure::Unreadable { .. })));
    }
}
