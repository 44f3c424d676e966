//! Persisted schemas keyed by classification id

use crate::backend::SchemaBackend;
use crate::error::StoreError;
use serde::Deserialize;
use shared_types::{Schema, SchemaSummary};
use tracing::{info, warn};

const SCHEMA_PREFIX: &str = "template_schema:";
/// Keys written by older releases for the same template
const MIRROR_PREFIXES: [&str; 2] = ["template_fields:", "template_fields_legacy:"];

/// Only the version of a stored schema, so unknown fields do not matter
#[derive(Deserialize)]
struct StoredVersion {
    version: u32,
}

/// Schema persistence over a [`SchemaBackend`]
///
/// Every save replaces the stored schema whole; there is no partial merge.
#[derive(Debug)]
pub struct SchemaStore<B> {
    backend: B,
}

impl<B: SchemaBackend> SchemaStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn key(id: &str) -> String {
        format!("{}{}", SCHEMA_PREFIX, id)
    }

    fn stored_version(&self, key: &str) -> Result<Option<u32>, StoreError> {
        let Some(raw) = self.backend.read(key)? else {
            return Ok(None);
        };
        match serde_json::from_str::<StoredVersion>(&raw) {
            Ok(stored) => Ok(Some(stored.version)),
            Err(e) => {
                warn!(key, error = %e, "overwriting unreadable stored schema");
                Ok(None)
            }
        }
    }

    /// Replace the schema stored for `id`
    ///
    /// A schema older than the stored one is rejected. An unreadable stored
    /// entry is overwritten.
    ///
    /// # Errors
    ///
    /// - [`StoreError::VersionRegression`] if `schema.version` is older than the stored one
    /// - [`StoreError::Unavailable`] if the backend cannot be read or written
    /// - [`StoreError::SerializationError`] if the schema cannot be serialized
    pub fn save(&mut self, id: &str, schema: &Schema) -> Result<(), StoreError> {
        let key = Self::key(id);
        if let Some(stored) = self.stored_version(&key)? {
            if schema.version < stored {
                return Err(StoreError::VersionRegression {
                    id: id.to_string(),
                    stored,
                    incoming: schema.version,
                });
            }
        }

        let json = serde_json::to_string(schema)?;
        self.backend.write(&key, &json)?;
        info!(
            id,
            backend = self.backend.name(),
            fields = schema.fields().len(),
            repeaters = schema.repeaters().len(),
            "Stored template schema"
        );
        Ok(())
    }

    /// The schema stored for `id`, `None` if there is none
    ///
    /// # Errors
    ///
    /// Storage failures are [`StoreError::Unavailable`] and entries that do
    /// not decode to a valid schema are [`StoreError::Corrupt`]; neither is
    /// reported as `None`.
    pub fn get(&self, id: &str) -> Result<Option<Schema>, StoreError> {
        let Some(raw) = self.backend.read(&Self::key(id))? else {
            return Ok(None);
        };
        let corrupt = |reason: String| StoreError::Corrupt {
            id: id.to_string(),
            reason,
        };
        let schema: Schema = serde_json::from_str(&raw).map_err(|e| corrupt(e.to_string()))?;
        schema.check().map_err(|e| corrupt(e.to_string()))?;
        Ok(Some(schema))
    }

    /// Remove the schema for `id` along with any older mirror entries
    ///
    /// Deleting an absent schema succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the backend refuses a removal.
    pub fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        self.backend.remove(&Self::key(id))?;
        for prefix in MIRROR_PREFIXES {
            self.backend.remove(&format!("{}{}", prefix, id))?;
        }
        info!(id, "Deleted template schema");
        Ok(())
    }

    /// Digest of a schema without re-parsing anything
    pub fn summarize(&self, schema: &Schema) -> SchemaSummary {
        schema.summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{FileBackend, MemoryBackend, OfflineBackend};
    use pretty_assertions::assert_eq;
    use shared_types::{
        BlockStyle, FieldDefinition, FieldKind, RepeaterDefinition, SchemaMeta, TemplateType,
    };

    fn schema(id: &str) -> Schema {
        let mut schema = Schema::new(SchemaMeta::new(TemplateType::Docx, id));
        schema
            .add_field(FieldDefinition::new("name", FieldKind::Text).unwrap())
            .unwrap();
        schema
            .add_repeater(RepeaterDefinition::new("items", BlockStyle::FreeBlock).unwrap())
            .unwrap();
        schema
    }

    #[test]
    fn test_absent_is_none() {
        let store = SchemaStore::new(MemoryBackend::new());
        assert!(store.get("7").unwrap().is_none());
    }

    #[test]
    fn test_save_and_get() {
        let mut store = SchemaStore::new(MemoryBackend::new());
        let saved = schema("7");
        store.save("7", &saved).unwrap();
        assert_eq!(store.get("7").unwrap(), Some(saved));
    }

    #[test]
    fn test_save_overwrites_whole() {
        let mut store = SchemaStore::new(MemoryBackend::new());
        store.save("7", &schema("7")).unwrap();

        let replacement = Schema::new(SchemaMeta::new(TemplateType::Odt, "7"));
        store.save("7", &replacement).unwrap();
        let stored = store.get("7").unwrap().unwrap();
        assert!(stored.is_empty());
        assert_eq!(stored.meta.template_type, TemplateType::Odt);
    }

    #[test]
    fn test_version_regression_rejected() {
        let mut store = SchemaStore::new(MemoryBackend::new());
        store.save("7", &schema("7")).unwrap();

        let mut older = schema("7");
        older.version = 1;
        let err = store.save("7", &older).unwrap_err();
        assert!(matches!(
            err,
            StoreError::VersionRegression {
                stored: 2,
                incoming: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_corrupt_entry_is_an_error() {
        let mut backend = MemoryBackend::new();
        backend.write("template_schema:7", "{not json").unwrap();
        let store = SchemaStore::new(backend);
        assert!(matches!(store.get("7"), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_invalid_slug_in_storage_is_corrupt() {
        let mut backend = MemoryBackend::new();
        let json = serde_json::to_string(&schema("7"))
            .unwrap()
            .replace("\"name\"", "\"Bad Slug\"");
        backend.write("template_schema:7", &json).unwrap();
        let store = SchemaStore::new(backend);
        assert!(matches!(store.get("7"), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_delete_removes_mirrors() {
        let mut backend = MemoryBackend::new();
        backend.write("template_fields:7", "[]").unwrap();
        backend.write("template_fields_legacy:7", "[]").unwrap();
        backend.write("template_fields:8", "[]").unwrap();
        let mut store = SchemaStore::new(backend);
        store.save("7", &schema("7")).unwrap();

        store.delete("7").unwrap();
        assert!(store.get("7").unwrap().is_none());
        assert_eq!(store.backend().len(), 1);
        assert!(store.backend().read("template_fields:8").unwrap().is_some());
    }

    #[test]
    fn test_backend_failures_propagate() {
        let mut store = SchemaStore::new(OfflineBackend);
        assert!(matches!(store.get("7"), Err(StoreError::Unavailable(_))));
        assert!(matches!(
            store.save("7", &schema("7")),
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(store.delete("7"), Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn test_summarize() {
        let store = SchemaStore::new(MemoryBackend::new());
        let summary = store.summarize(&schema("7"));
        assert_eq!(summary.field_count, 1);
        assert_eq!(summary.repeater_names, vec!["items".to_string()]);
    }

    #[test]
    fn test_file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let saved = schema("42");
        {
            let mut store = SchemaStore::new(FileBackend::open(dir.path()).unwrap());
            store.save("42", &saved).unwrap();
        }
        let store = SchemaStore::new(FileBackend::open(dir.path()).unwrap());
        assert_eq!(store.get("42").unwrap(), Some(saved));
    }
}
