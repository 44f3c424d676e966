//! Key-value backends the schema store persists through

use crate::error::StoreError;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// String key-value storage
pub trait SchemaBackend {
    /// Backend identifier
    fn name(&self) -> &'static str;

    /// Value stored under `key`, `None` if absent
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value
    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`; removing an absent key is not an error
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

impl<B: SchemaBackend + ?Sized> SchemaBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).read(key)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).write(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// Process-local backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SchemaBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One JSON file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Use `root`, creating it if needed
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", root.display(), e)))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File for `key`; bytes outside `[A-Za-z0-9_-]` are percent-encoded
    fn path_for(&self, key: &str) -> PathBuf {
        let mut name = String::with_capacity(key.len() + 5);
        for b in key.bytes() {
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'-' {
                name.push(b as char);
            } else {
                name.push_str(&format!("%{:02X}", b));
            }
        }
        name.push_str(".json");
        self.root.join(name)
    }
}

fn unavailable(path: &Path, e: std::io::Error) -> StoreError {
    StoreError::Unavailable(format!("{}: {}", path.display(), e))
}

impl SchemaBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(unavailable(&path, e)),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        debug!(path = %path.display(), "writing key");
        fs::write(&path, value).map_err(|e| unavailable(&path, e))
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(unavailable(&path, e)),
        }
    }
}

/// Backend whose storage is always out of reach
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct OfflineBackend;

#[cfg(test)]
impl SchemaBackend for OfflineBackend {
    fn name(&self) -> &'static str {
        "offline"
    }

    fn read(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("offline".to_string()))
    }

    fn write(&mut self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("offline".to_string()))
    }

    fn remove(&mut self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("offline".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_memory_backend() {
        let mut backend = MemoryBackend::new();
        assert_eq!(backend.read("a").unwrap(), None);
        backend.write("a", "1").unwrap();
        backend.write("a", "2").unwrap();
        assert_eq!(backend.read("a").unwrap().as_deref(), Some("2"));
        backend.remove("a").unwrap();
        backend.remove("a").unwrap();
        assert!(backend.is_empty());
    }

    #[test]
    fn test_file_backend_keys_map_to_safe_names() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        assert_eq!(
            backend.path_for("template_fields:42"),
            dir.path().join("template_fields%3A42.json")
        );
        assert_eq!(
            backend.path_for("../escape"),
            dir.path().join("%2E%2E%2Fescape.json")
        );
    }

    #[test]
    fn test_file_backend_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = FileBackend::open(dir.path().join("nested")).unwrap();
        assert_eq!(backend.read("k").unwrap(), None);
        backend.write("k", "{}").unwrap();
        assert_eq!(backend.read("k").unwrap().as_deref(), Some("{}"));
        backend.remove("k").unwrap();
        backend.remove("k").unwrap();
        assert_eq!(backend.read("k").unwrap(), None);
    }

    #[test]
    fn test_unreadable_entry_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        // A directory where the file should be cannot be read as text.
        std::fs::create_dir(backend.path_for("k")).unwrap();
        assert!(matches!(backend.read("k"), Err(StoreError::Unavailable(_))));
    }
}
