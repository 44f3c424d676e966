//! Per-kind value cleanup applied before a value is stored

use crate::array::{decode_items, encode_items, truncate_items};
use crate::error::CodecError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use shared_types::ValueKind;
use tracing::debug;

/// Default cap on stored repeater items
pub const MAX_ARRAY_ITEMS: usize = 20;

lazy_static! {
    static ref SCRIPT_ELEMENT: Regex =
        Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap();
    static ref STYLE_ELEMENT: Regex = Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").unwrap();
    static ref IFRAME_ELEMENT: Regex =
        Regex::new(r"(?is)<iframe\b[^>]*>.*?</iframe\s*>").unwrap();
    // Openers or closers left over after the element pass (unterminated, self-closing, stray)
    static ref LEFTOVER_TAG: Regex = Regex::new(r"(?i)</?(?:script|style|iframe)\b[^>]*>?").unwrap();
}

/// Limits applied while sanitizing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    pub max_array_items: usize,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            max_array_items: MAX_ARRAY_ITEMS,
        }
    }
}

/// Strip executable and styling elements from rich text
pub fn strip_unsafe_markup(html: &str) -> String {
    let cleaned = SCRIPT_ELEMENT.replace_all(html, "");
    let cleaned = STYLE_ELEMENT.replace_all(&cleaned, "");
    let cleaned = IFRAME_ELEMENT.replace_all(&cleaned, "");
    LEFTOVER_TAG.replace_all(&cleaned, "").into_owned()
}

/// Clean a value according to its storage kind
///
/// Arrays are re-encoded with at most `max_array_items` items; rich text
/// loses script, style and iframe elements; plain text is kept as is.
pub fn sanitize_value(
    kind: ValueKind,
    value: &str,
    options: &CodecOptions,
) -> Result<String, CodecError> {
    match kind {
        ValueKind::Array => {
            let items = decode_items(value)?;
            if items.len() > options.max_array_items {
                debug!(
                    items = items.len(),
                    max = options.max_array_items,
                    "truncating array value"
                );
            }
            encode_items(&truncate_items(items, options.max_array_items))
        }
        ValueKind::Rich => Ok(strip_unsafe_markup(value)),
        ValueKind::Single | ValueKind::Textarea => Ok(value.to_string()),
    }
}
