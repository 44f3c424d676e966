//! Rebuild a document's structured content on save
//!
//! The stored blob is never patched. Every save recomputes the full value
//! list from three inputs: the current schema, the values submitted now and
//! the values decoded from the previous blob. Stored values whose slug the
//! schema no longer knows are carried over as `rich` so a schema change
//! never drops data.

use crate::array::{decode_items, encode_items, truncate_items, Item};
use crate::blob;
use crate::error::CodecError;
use crate::sanitize::{sanitize_value, strip_unsafe_markup, CodecOptions};
use crate::validation::{normalize, validate_with, PatternCache, ValidationMismatch};
use serde::{Deserialize, Serialize};
use shared_types::{
    is_valid_slug, FieldDefinition, RepeaterDefinition, Schema, StructuredFieldValue, ValueKind,
};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// A value submitted for one slug: a string, or a list of item objects
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Submission {
    Text(String),
    Items(Vec<Item>),
}

/// Result of a three-way rebuild
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Values to encode, schema order first
    pub values: Vec<StructuredFieldValue>,
    /// Slugs kept although the schema does not declare them
    pub unknown: Vec<String>,
    pub mismatches: Vec<ValidationMismatch>,
}

/// A rebuilt blob ready to persist
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedDocument {
    pub blob: String,
    pub unknown: Vec<String>,
    pub mismatches: Vec<ValidationMismatch>,
}

fn mismatch(slug: &str, message: impl Into<String>) -> ValidationMismatch {
    ValidationMismatch {
        slug: slug.to_string(),
        message: message.into(),
    }
}

/// Per-save state shared by every field of one rebuild
struct Rebuild<'a> {
    options: &'a CodecOptions,
    patterns: PatternCache,
    mismatches: Vec<ValidationMismatch>,
}

impl Rebuild<'_> {
    /// Normalize, validate and sanitize one submitted string
    fn clean(&mut self, field: &FieldDefinition, raw: &str) -> Result<String, CodecError> {
        let value = normalize(field.data_type, raw);
        if let Err(e) = validate_with(field, &value, &mut self.patterns) {
            self.mismatches.push(e);
        }
        sanitize_value(field.kind.legacy_kind(), &value, self.options)
    }

    /// Apply the nested field rules of `repeater` to each submitted item
    ///
    /// Keys the repeater does not declare are dropped. Mismatches are
    /// reported as `repeater.index.field`.
    fn clean_items(
        &mut self,
        repeater: &RepeaterDefinition,
        items: Vec<Item>,
    ) -> Result<Vec<Item>, CodecError> {
        if items.len() > self.options.max_array_items {
            debug!(
                slug = repeater.slug(),
                items = items.len(),
                max = self.options.max_array_items,
                "truncating array value"
            );
        }
        let items = truncate_items(items, self.options.max_array_items);

        let mut cleaned = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let mut row = Item::new();
            for (key, raw) in item {
                let Some(field) = repeater.field(&key) else {
                    warn!(slug = repeater.slug(), %key, "dropping undeclared item key");
                    continue;
                };
                let before = self.mismatches.len();
                let value = self.clean(field, &raw)?;
                for e in &mut self.mismatches[before..] {
                    e.slug = format!("{}.{}.{}", repeater.slug(), index, key);
                }
                row.insert(key, value);
            }
            cleaned.push(row);
        }
        Ok(cleaned)
    }

    fn scalar_value(
        &mut self,
        field: &FieldDefinition,
        submitted: Option<&Submission>,
        previous: Option<&StructuredFieldValue>,
    ) -> String {
        let kept = || previous.map(|p| p.value.clone()).unwrap_or_default();

        match submitted {
            Some(Submission::Text(raw)) => match self.clean(field, raw) {
                Ok(clean) => clean,
                Err(e) => {
                    self.mismatches.push(mismatch(field.slug(), e.to_string()));
                    kept()
                }
            },
            Some(Submission::Items(_)) => {
                self.mismatches.push(mismatch(
                    field.slug(),
                    format!("{} expects a single value, not a list", field.label),
                ));
                kept()
            }
            None => kept(),
        }
    }

    fn array_value(
        &mut self,
        repeater: &RepeaterDefinition,
        submitted: Option<&Submission>,
        previous: Option<&StructuredFieldValue>,
    ) -> Result<String, CodecError> {
        let kept = || match previous {
            Some(p) => Ok(p.value.clone()),
            None => encode_items(&[]),
        };

        let items = match submitted {
            Some(Submission::Items(items)) => items.clone(),
            Some(Submission::Text(raw)) => match decode_items(raw) {
                Ok(items) => items,
                Err(e) => {
                    self.mismatches.push(mismatch(repeater.slug(), e.to_string()));
                    return kept();
                }
            },
            None => return kept(),
        };
        encode_items(&self.clean_items(repeater, items)?)
    }
}

/// Compute the full value list for a save
///
/// Schema fields come first in schema order, then repeaters, then unknown
/// slugs in sorted order. A field falls back to its previous value when
/// nothing was submitted and to an empty value when it never had one.
/// Validation mismatches are reported but the submitted value is stored.
/// Repeater items are checked against the repeater's nested fields.
///
/// # Errors
///
/// Returns [`CodecError`] when an item list cannot be encoded. Malformed
/// submitted arrays are reported as mismatches instead.
pub fn rebuild(
    schema: &Schema,
    submitted: &BTreeMap<String, Submission>,
    previous: &BTreeMap<String, StructuredFieldValue>,
    options: &CodecOptions,
) -> Result<MergeOutcome, CodecError> {
    let mut outcome = MergeOutcome::default();
    let mut state = Rebuild {
        options,
        patterns: PatternCache::new(),
        mismatches: Vec::new(),
    };

    for field in schema.fields() {
        let slug = field.slug();
        let value = state.scalar_value(field, submitted.get(slug), previous.get(slug));
        outcome.values.push(StructuredFieldValue::new(
            slug,
            field.kind.legacy_kind(),
            value,
        ));
    }

    for repeater in schema.repeaters() {
        let slug = repeater.slug();
        let value = state.array_value(repeater, submitted.get(slug), previous.get(slug))?;
        outcome
            .values
            .push(StructuredFieldValue::new(slug, ValueKind::Array, value));
    }
    outcome.mismatches = state.mismatches;

    let mut unknown: BTreeMap<&str, StructuredFieldValue> = previous
        .iter()
        .filter(|(slug, _)| !schema.contains_slug(slug))
        .map(|(slug, stored)| {
            (
                slug.as_str(),
                StructuredFieldValue::new(slug.clone(), ValueKind::Rich, stored.value.clone()),
            )
        })
        .collect();

    for (slug, submission) in submitted {
        if schema.contains_slug(slug) {
            continue;
        }
        if !is_valid_slug(slug) {
            warn!(%slug, "ignoring submitted value with invalid slug");
            continue;
        }
        let value = match submission {
            Submission::Text(raw) => sanitize_value(ValueKind::Rich, raw, options)?,
            Submission::Items(items) => {
                let items: Vec<Item> = truncate_items(items.clone(), options.max_array_items)
                    .into_iter()
                    .map(|item| {
                        item.into_iter()
                            .map(|(key, value)| (key, strip_unsafe_markup(&value)))
                            .collect()
                    })
                    .collect();
                encode_items(&items)?
            }
        };
        debug!(%slug, "keeping submitted value for undeclared field");
        unknown.insert(
            slug.as_str(),
            StructuredFieldValue::new(slug.clone(), ValueKind::Rich, value),
        );
    }

    for (slug, value) in unknown {
        outcome.unknown.push(slug.to_string());
        outcome.values.push(value);
    }

    Ok(outcome)
}

/// Rebuild and encode a document's blob
///
/// `previous_blob` is the currently stored blob, if any.
///
/// # Errors
///
/// Propagates [`rebuild`] failures; nothing is encoded in that case.
pub fn save_document(
    schema: &Schema,
    submitted: &BTreeMap<String, Submission>,
    previous_blob: Option<&str>,
    options: &CodecOptions,
) -> Result<SavedDocument, CodecError> {
    let previous = previous_blob.map(blob::decode).unwrap_or_default();
    let outcome = rebuild(schema, submitted, &previous, options)?;

    if !outcome.unknown.is_empty() {
        info!(
            template = %schema.meta.template_id,
            unknown = ?outcome.unknown,
            "Preserved values for fields missing from the schema"
        );
    }

    Ok(SavedDocument {
        blob: blob::encode(&outcome.values),
        unknown: outcome.unknown,
        mismatches: outcome.mismatches,
    })
}
