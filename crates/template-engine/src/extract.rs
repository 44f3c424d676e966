//! Template container checks and the text extraction boundary
//!
//! Templates are ZIP-based office documents. Turning their XML parts into a
//! flattened text stream with marker brackets intact is done by an external
//! collaborator behind [`TextExtractor`]; this module only verifies that the
//! file is readable and looks like a supported container.

use crate::errors::ParseFailure;
use shared_types::TemplateType;
use std::fs;
use std::path::{Path, PathBuf};

/// Local file header signature that starts every ZIP archive
const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";

/// Produces the flattened text stream of a template
pub trait TextExtractor {
    fn extract(&self, path: &Path, template_type: TemplateType) -> Result<String, ParseFailure>;
}

/// Reads text that an upstream converter already flattened into a file
#[derive(Debug, Clone)]
pub struct FlattenedTextExtractor {
    text_path: PathBuf,
}

impl FlattenedTextExtractor {
    pub fn new(text_path: impl Into<PathBuf>) -> Self {
        Self {
            text_path: text_path.into(),
        }
    }
}

impl TextExtractor for FlattenedTextExtractor {
    fn extract(&self, _path: &Path, _template_type: TemplateType) -> Result<String, ParseFailure> {
        fs::read_to_string(&self.text_path).map_err(|e| {
            ParseFailure::Extraction(format!("{}: {}", self.text_path.display(), e))
        })
    }
}

/// Returns a fixed text regardless of the template
#[derive(Debug, Clone, Default)]
pub struct StaticTextExtractor {
    text: String,
}

impl StaticTextExtractor {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl TextExtractor for StaticTextExtractor {
    fn extract(&self, _path: &Path, _template_type: TemplateType) -> Result<String, ParseFailure> {
        Ok(self.text.clone())
    }
}

/// Check that `path` is a readable docx/odt container and report its type
pub fn open_template(path: &Path) -> Result<TemplateType, ParseFailure> {
    let template_type = TemplateType::from_path(path);
    if template_type == TemplateType::Unknown {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        return Err(ParseFailure::UnsupportedFormat(ext));
    }

    let bytes = fs::read(path).map_err(|source| ParseFailure::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    if !bytes.starts_with(ZIP_MAGIC) {
        return Err(ParseFailure::NotAContainer(path.to_path_buf()));
    }

    Ok(template_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn test_open_docx_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "letter.docx", b"PK\x03\x04rest-of-archive");
        assert_eq!(open_template(&path).unwrap(), TemplateType::Docx);
    }

    #[test]
    fn test_open_rejects_non_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "letter.odt", b"plain text");
        assert!(matches!(
            open_template(&path),
            Err(ParseFailure::NotAContainer(_))
        ));
    }

    #[test]
    fn test_open_rejects_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "letter.pdf", b"PK\x03\x04");
        match open_template(&path) {
            Err(ParseFailure::UnsupportedFormat(ext)) => assert_eq!(ext, "pdf"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.odt");
        let err = open_template(&path).unwrap_err();
        assert!(matches!(err, ParseFailure::Unreadable { .. }));
        assert!(err.user_message().contains("could not be read"));
    }

    #[test]
    fn test_flattened_extractor_reads_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let text = write_file(dir.path(), "flat.txt", b"Dear [name;type='text']");
        let extractor = FlattenedTextExtractor::new(&text);
        let out = extractor
            .extract(Path::new("ignored.odt"), TemplateType::Odt)
            .unwrap();
        assert_eq!(out, "Dear [name;type='text']");
    }

    #[test]
    fn test_flattened_extractor_missing_text() {
        let extractor = FlattenedTextExtractor::new("/nonexistent/flat.txt");
        assert!(matches!(
            extractor.extract(Path::new("a.odt"), TemplateType::Odt),
            Err(ParseFailure::Extraction(_))
        ));
    }
}
