//! JSON sub-codec for repeater values
//!
//! An `array` field stores its items as a JSON array of objects mapping
//! nested-field slugs to strings. Quotes, apostrophes, angle brackets and
//! ampersands are written as `\u00XX` hex escapes so the payload survives an
//! outside escape/unescape round trip; other characters are written as is.
//!
//! That round trip sometimes loses the backslash of an escape, leaving a bare
//! `u003C`. Decoding therefore reads any `u` followed by four hex digits as a
//! UTF-16 code unit. Text that legitimately contains such a run (`menu2024`)
//! is rewritten as well; this is a known limitation of the format.

use crate::error::CodecError;
use serde::Serialize;
use serde_json::ser::{CharEscape, CompactFormatter, Formatter};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io;

/// One repeater item: nested-field slug -> value
pub type Item = BTreeMap<String, String>;

/// Compact JSON formatter with hex escapes for markup-sensitive characters
struct HexEscapeFormatter;

impl Formatter for HexEscapeFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let bytes = fragment.as_bytes();
        let mut start = 0;
        for (i, b) in bytes.iter().enumerate() {
            let escape: &[u8] = match b {
                b'<' => b"\\u003C",
                b'>' => b"\\u003E",
                b'&' => b"\\u0026",
                b'\'' => b"\\u0027",
                _ => continue,
            };
            writer.write_all(&bytes[start..i])?;
            writer.write_all(escape)?;
            start = i + 1;
        }
        writer.write_all(&bytes[start..])
    }

    fn write_char_escape<W>(&mut self, writer: &mut W, char_escape: CharEscape) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        match char_escape {
            CharEscape::Quote => writer.write_all(b"\\u0022"),
            other => CompactFormatter.write_char_escape(writer, other),
        }
    }
}

/// Serialize items to the stored JSON form
pub fn encode_items(items: &[Item]) -> Result<String, CodecError> {
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, HexEscapeFormatter);
    items.serialize(&mut serializer)?;
    String::from_utf8(buf).map_err(|e| CodecError::InvalidArray(e.to_string()))
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Parse a stored payload back into items
///
/// An empty payload is an empty list. Non-object entries are skipped and
/// non-string values are stringified.
pub fn decode_items(payload: &str) -> Result<Vec<Item>, CodecError> {
    if payload.trim().is_empty() {
        return Ok(Vec::new());
    }

    let entries = match serde_json::from_str::<Value>(payload) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) => return Err(CodecError::InvalidArray("expected a JSON array".to_string())),
        Err(e) => return Err(CodecError::InvalidArray(e.to_string())),
    };

    Ok(entries
        .into_iter()
        .filter_map(|entry| match entry {
            Value::Object(map) => Some(
                map.into_iter()
                    .map(|(k, v)| (k, repair_unicode_escapes(&value_to_string(v))))
                    .collect(),
            ),
            _ => None,
        })
        .collect())
}

/// Keep the first `max` items in order
pub fn truncate_items(mut items: Vec<Item>, max: usize) -> Vec<Item> {
    items.truncate(max);
    items
}

fn hex_unit(bytes: &[u8], at: usize) -> Option<u32> {
    let digits = bytes.get(at..at + 4)?;
    if !digits.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    u32::from_str_radix(std::str::from_utf8(digits).ok()?, 16).ok()
}

/// Turn bare `uXXXX` runs back into the characters they encode
///
/// Surrogate pairs written as two runs are combined; a lone surrogate is left
/// untouched. A `u` preceded by a backslash is not a bare run.
pub fn repair_unicode_escapes(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'u' && (i == 0 || bytes[i - 1] != b'\\') {
            if let Some(unit) = hex_unit(bytes, i + 1) {
                let decoded = match unit {
                    0xD800..=0xDBFF => {
                        let low = (bytes.get(i + 5) == Some(&b'u'))
                            .then(|| hex_unit(bytes, i + 6))
                            .flatten();
                        match low {
                            Some(low @ 0xDC00..=0xDFFF) => {
                                char::from_u32(0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00))
                                    .map(|c| (c, 10))
                            }
                            _ => None,
                        }
                    }
                    0xDC00..=0xDFFF => None,
                    _ => char::from_u32(unit).map(|c| (c, 5)),
                };

                if let Some((c, consumed)) = decoded {
                    out.push_str(&text[copied..i]);
                    out.push(c);
                    i += consumed;
                    copied = i;
                    continue;
                }
            }
        }
        i += 1;
    }

    out.push_str(&text[copied..]);
    out
}
