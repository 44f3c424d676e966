//! Persistence for parsed template schemas
//!
//! - `backend`: key-value backends (in-memory, one file per key)
//! - `store`: whole-schema save/get/delete with version checks
//! - `reparse`: re-parse a template and replace or clear its schema

pub mod backend;
pub mod error;
pub mod reparse;
pub mod store;

pub use backend::{FileBackend, MemoryBackend, SchemaBackend};
pub use error::StoreError;
pub use reparse::{ReparseEvent, ReparseOutcome, ReparseTrigger, SchemaSync, SyncError};
pub use store::SchemaStore;
