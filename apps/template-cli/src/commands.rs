//! Subcommand implementations
//!
//! Each command returns the text to print on stdout; logs go to stderr.

use crate::cli::Command;
use crate::config::{AppConfig, BackendKind};
use anyhow::{bail, Context, Result};
use content_codec::{decode, encode, save_document, Submission};
use schema_store::{
    FileBackend, MemoryBackend, ReparseEvent, ReparseTrigger, SchemaBackend, SchemaStore,
    SchemaSync,
};
use shared_types::{Schema, StructuredFieldValue};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use template_engine::{parse_template, to_legacy, FlattenedTextExtractor};
use tracing::warn;

type DynStore = SchemaStore<Box<dyn SchemaBackend>>;

fn open_store(config: &AppConfig) -> Result<DynStore> {
    let backend: Box<dyn SchemaBackend> = match config.store.backend {
        BackendKind::File => Box::new(
            FileBackend::open(&config.store.path).with_context(|| {
                format!("Failed to open schema store at {}", config.store.path.display())
            })?,
        ),
        BackendKind::Memory => Box::new(MemoryBackend::new()),
    };
    Ok(SchemaStore::new(backend))
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn default_template_id(template: &Path) -> String {
    template
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn parse(template: &Path, text: &Path, template_id: Option<String>) -> Result<Schema> {
    let id = template_id.unwrap_or_else(|| default_template_id(template));
    let extractor = FlattenedTextExtractor::new(text);
    parse_template(template, &extractor, &id)
        .with_context(|| format!("Failed to parse template {}", template.display()))
}

fn stored_schema(store: &DynStore, id: &str) -> Result<Schema> {
    match store.get(id)? {
        Some(schema) => Ok(schema),
        None => bail!("No schema stored for '{}'", id),
    }
}

/// Execute one subcommand
pub fn run(command: Command, config: &AppConfig) -> Result<String> {
    match command {
        Command::Parse {
            template,
            text,
            template_id,
        } => {
            let schema = parse(&template, &text, template_id)?;
            Ok(serde_json::to_string_pretty(&schema)?)
        }

        Command::Legacy {
            template,
            text,
            template_id,
        } => {
            let schema = parse(&template, &text, template_id)?;
            Ok(serde_json::to_string_pretty(&to_legacy(&schema))?)
        }

        Command::Reparse { id, template, text } => {
            let mut store = open_store(config)?;
            let extractor = FlattenedTextExtractor::new(text);
            let event = ReparseEvent {
                classification_id: id,
                template_path: template,
                trigger: ReparseTrigger::Requested,
            };
            let outcome = SchemaSync::new(&mut store, &extractor).handle(&event)?;
            Ok(serde_json::to_string_pretty(&outcome)?)
        }

        Command::Show { id } => {
            let store = open_store(config)?;
            Ok(serde_json::to_string_pretty(&stored_schema(&store, &id)?)?)
        }

        Command::Summary { id } => {
            let store = open_store(config)?;
            let schema = stored_schema(&store, &id)?;
            Ok(serde_json::to_string_pretty(&store.summarize(&schema))?)
        }

        Command::Delete { id } => {
            let mut store = open_store(config)?;
            store.delete(&id)?;
            Ok(format!("Deleted schema '{}'", id))
        }

        Command::Fill {
            id,
            values,
            previous,
        } => {
            let store = open_store(config)?;
            let schema = stored_schema(&store, &id)?;
            let submitted: BTreeMap<String, Submission> = serde_json::from_str(&read(&values)?)
                .with_context(|| format!("Invalid submitted values in {}", values.display()))?;
            let previous = previous.as_deref().map(read).transpose()?;

            let saved = save_document(&schema, &submitted, previous.as_deref(), &config.codec)?;
            for mismatch in &saved.mismatches {
                warn!(slug = %mismatch.slug, "{}", mismatch.message);
            }
            if !saved.unknown.is_empty() {
                warn!(unknown = ?saved.unknown, "values kept for fields not in the schema");
            }
            Ok(saved.blob)
        }

        Command::Encode { values } => {
            let values: Vec<StructuredFieldValue> = serde_json::from_str(&read(&values)?)
                .with_context(|| format!("Invalid field values in {}", values.display()))?;
            Ok(encode(&values))
        }

        Command::Decode { blob } => Ok(serde_json::to_string_pretty(&decode(&read(&blob)?))?),
    }
}
