//! Re-parse a template and replace its stored schema
//!
//! A [`SchemaSync`] borrows the store mutably for the whole event, so the
//! save it performs cannot trigger a nested re-parse of the same store.

use crate::backend::SchemaBackend;
use crate::error::StoreError;
use crate::store::SchemaStore;
use serde::Serialize;
use shared_types::SchemaSummary;
use std::path::PathBuf;
use template_engine::{parse_template, TextExtractor};
use thiserror::Error;
use tracing::{info, warn};

/// Why a re-parse was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReparseTrigger {
    /// A template file was attached or replaced
    TemplateAttached,
    /// An operator asked for it explicitly
    Requested,
}

#[derive(Debug, Clone)]
pub struct ReparseEvent {
    pub classification_id: String,
    pub template_path: PathBuf,
    pub trigger: ReparseTrigger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ReparseOutcome {
    /// The stored schema was replaced
    Replaced { summary: SchemaSummary },
    /// The template could not be parsed and the stored schema was removed
    Cleared { message: String },
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct SchemaSync<'a, B> {
    store: &'a mut SchemaStore<B>,
    extractor: &'a dyn TextExtractor,
}

impl<'a, B: SchemaBackend> SchemaSync<'a, B> {
    pub fn new(store: &'a mut SchemaStore<B>, extractor: &'a dyn TextExtractor) -> Self {
        Self { store, extractor }
    }

    /// Parse the event's template and replace or clear the stored schema
    ///
    /// A parse failure clears the cached schema instead of keeping a stale
    /// one and is reported as [`ReparseOutcome::Cleared`].
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] when saving the new schema or clearing the
    /// old one fails. A template that cannot be parsed is not an error.
    pub fn handle(&mut self, event: &ReparseEvent) -> Result<ReparseOutcome, SyncError> {
        let id = event.classification_id.as_str();

        match parse_template(&event.template_path, self.extractor, id) {
            Ok(schema) => {
                self.store.save(id, &schema)?;
                let summary = self.store.summarize(&schema);
                info!(
                    id,
                    trigger = ?event.trigger,
                    fields = summary.field_count,
                    repeaters = summary.repeater_names.len(),
                    "Template schema replaced"
                );
                Ok(ReparseOutcome::Replaced { summary })
            }
            Err(failure) => {
                warn!(
                    id,
                    trigger = ?event.trigger,
                    error = %failure,
                    "Template parse failed, clearing stored schema"
                );
                self.store.delete(id)?;
                Ok(ReparseOutcome::Cleared {
                    message: failure.user_message(),
                })
            }
        }
    }
}
