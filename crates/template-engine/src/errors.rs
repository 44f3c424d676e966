//! Error types for template parsing

use std::path::PathBuf;
use thiserror::Error;

/// A template could not be turned into a schema
///
/// Only file-level problems surface here. Malformed markers inside a readable
/// template are skipped by the scanner and never become errors.
#[derive(Error, Debug)]
pub enum ParseFailure {
    #[error("Template unreadable: {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported template format: '{0}' (expected docx or odt)")]
    UnsupportedFormat(String),

    #[error("Not a recognized document container: {0}")]
    NotAContainer(PathBuf),

    #[error("Text extraction failed: {0}")]
    Extraction(String),
}

impl ParseFailure {
    /// Message suitable for an operator notice
    pub fn user_message(&self) -> String {
        match self {
            ParseFailure::Unreadable { path, .. } => {
                format!("The template file {} could not be read.", path.display())
            }
            ParseFailure::UnsupportedFormat(ext) if ext.is_empty() => {
                "The template has no file extension; use a .docx or .odt file.".to_string()
            }
            ParseFailure::UnsupportedFormat(ext) => {
                format!("Templates of type .{} are not supported; use .docx or .odt.", ext)
            }
            ParseFailure::NotAContainer(path) => format!(
                "{} is not a valid office document.",
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string())
            ),
            ParseFailure::Extraction(msg) => format!("Could not read template text: {}", msg),
        }
    }
}
