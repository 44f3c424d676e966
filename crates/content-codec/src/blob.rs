//! Structured content blob
//!
//! All field values of a document are stored in one text payload so revisions
//! diff cleanly. Each field is wrapped in a marker pair:
//!
//! ```text
//! <!-- field slug="bio" type="rich" -->
//! <p>Hi</p>
//! <!-- /field -->
//! ```
//!
//! Fields are separated by a blank line. Exactly one newline after the open
//! marker and one before the close marker belong to the framing, so values
//! keep their own leading and trailing whitespace.

use lazy_static::lazy_static;
use regex::Regex;
use shared_types::{is_valid_slug, StructuredFieldValue, ValueKind};
use std::collections::BTreeMap;
use tracing::{debug, warn};

const OPEN_PREFIX: &str = "<!-- field ";
const COMMENT_END: &str = "-->";
const CLOSE_MARKER: &str = "<!-- /field -->";

lazy_static! {
    static ref ATTRIBUTE: Regex = Regex::new(r#"([a-z_]+)="([^"]*)""#).unwrap();
}

fn open_marker(value: &StructuredFieldValue) -> String {
    format!(
        "{}slug=\"{}\" type=\"{}\" {}",
        OPEN_PREFIX, value.slug, value.kind, COMMENT_END
    )
}

/// Serialize field values in the given order
///
/// Values whose slug is not a valid key are skipped.
pub fn encode(values: &[StructuredFieldValue]) -> String {
    let mut out = String::new();
    for value in values {
        if !is_valid_slug(&value.slug) {
            warn!(slug = %value.slug, "skipping field with invalid slug");
            continue;
        }
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(&open_marker(value));
        out.push('\n');
        out.push_str(&value.value);
        out.push('\n');
        out.push_str(CLOSE_MARKER);
    }
    out
}

/// Slug and kind from the inside of an open marker
fn parse_header(header: &str) -> Option<(String, ValueKind)> {
    let mut slug = None;
    let mut kind = None;
    for caps in ATTRIBUTE.captures_iter(header) {
        match &caps[1] {
            "slug" => slug = Some(caps[2].to_string()),
            "type" => kind = ValueKind::parse(&caps[2]),
            _ => {}
        }
    }
    let slug = slug.filter(|s| is_valid_slug(s))?;
    Some((slug, kind.unwrap_or(ValueKind::Rich)))
}

fn strip_framing(body: &str) -> &str {
    let body = body.strip_prefix('\n').unwrap_or(body);
    body.strip_suffix('\n').unwrap_or(body)
}

/// Extract every well-formed field from a blob
///
/// A field whose close marker is missing, or that runs into the next open
/// marker first, is dropped whole. An open marker must sit on one line; a
/// header spanning lines or holding another open marker is skipped and
/// scanning resumes inside it. A missing or unknown `type` decodes as
/// `rich`. If a slug occurs twice the later field wins.
pub fn decode(blob: &str) -> BTreeMap<String, StructuredFieldValue> {
    let mut fields = BTreeMap::new();
    let mut pos = 0;

    while let Some(rel) = blob[pos..].find(OPEN_PREFIX) {
        let start = pos + rel;
        let header_start = start + OPEN_PREFIX.len();
        let Some(header_len) = blob[header_start..].find(COMMENT_END) else {
            debug!(offset = start, "open marker never terminated");
            break;
        };
        let header = &blob[header_start..header_start + header_len];
        if header.contains('\n') || header.contains(OPEN_PREFIX) {
            debug!(offset = start, "malformed open marker skipped");
            pos = header
                .find(OPEN_PREFIX)
                .map_or(header_start, |inner| header_start + inner);
            continue;
        }
        let body_start = header_start + header_len + COMMENT_END.len();

        let Some(close_rel) = blob[body_start..].find(CLOSE_MARKER) else {
            debug!(offset = start, "field without close marker dropped");
            break;
        };
        let body = &blob[body_start..body_start + close_rel];

        if let Some(next_open) = body.find(OPEN_PREFIX) {
            debug!(offset = start, "field interrupted by the next open marker, dropped");
            pos = body_start + next_open;
            continue;
        }
        pos = body_start + close_rel + CLOSE_MARKER.len();

        match parse_header(header) {
            Some((slug, kind)) => {
                let value = StructuredFieldValue::new(slug.clone(), kind, strip_framing(body));
                fields.insert(slug, value);
            }
            None => debug!(offset = start, "field without usable slug dropped"),
        }
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_encode_layout() {
        let blob = encode(&[
            StructuredFieldValue::new("name", ValueKind::Single, "Ada"),
            StructuredFieldValue::new("bio", ValueKind::Rich, "<p>Hi</p>"),
        ]);
        assert_eq!(
            blob,
            "<!-- field slug=\"name\" type=\"single\" -->\nAda\n<!-- /field -->\n\n\
             <!-- field slug=\"bio\" type=\"rich\" -->\n<p>Hi</p>\n<!-- /field -->"
        );
    }

    #[test]
    fn test_rich_round_trip() {
        let blob = encode(&[StructuredFieldValue::new("bio", ValueKind::Rich, "<p>Hi</p>")]);
        let decoded = decode(&blob);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded["bio"].value, "<p>Hi</p>");
        assert_eq!(decoded["bio"].kind, ValueKind::Rich);
    }

    #[test]
    fn test_whitespace_is_preserved() {
        let value = "\n  indented\n\n";
        let blob = encode(&[StructuredFieldValue::new("notes", ValueKind::Textarea, value)]);
        assert_eq!(decode(&blob)["notes"].value, value);
    }

    #[test]
    fn test_missing_close_marker_drops_field() {
        let blob = "<!-- field slug=\"a\" type=\"single\" -->\nkept\n<!-- /field -->\n\n\
                    <!-- field slug=\"b\" type=\"single\" -->\nhalf a value";
        let decoded = decode(blob);
        assert!(decoded.contains_key("a"));
        assert!(!decoded.contains_key("b"));
    }

    #[test]
    fn test_interrupted_field_is_dropped_but_next_survives() {
        let blob = "<!-- field slug=\"a\" type=\"single\" -->\nbroken\n\n\
                    <!-- field slug=\"b\" type=\"textarea\" -->\nfine\n<!-- /field -->";
        let decoded = decode(blob);
        assert_eq!(decoded.keys().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(decoded["b"].value, "fine");
        assert_eq!(decoded["b"].kind, ValueKind::Textarea);
    }

    #[test]
    fn test_unterminated_open_marker_does_not_swallow_the_next() {
        let blob = "<!-- field slug=\"a\" type=\"single\"\n\
                    <!-- field type=\"textarea\" -->\nx\n<!-- /field -->\n\n\
                    <!-- field slug=\"b\" type=\"single\" -->\nfine\n<!-- /field -->";
        let decoded = decode(blob);
        assert_eq!(decoded.keys().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(decoded["b"].value, "fine");
    }

    #[test]
    fn test_open_marker_spanning_lines_is_skipped() {
        let blob = "<!-- field slug=\"a\"\ntype=\"single\" -->\nx\n<!-- /field -->\n\n\
                    <!-- field slug=\"a\"\n<!-- field slug=\"c\" type=\"textarea\" -->\nkept\n<!-- /field -->";
        let decoded = decode(blob);
        assert_eq!(decoded.keys().collect::<Vec<_>>(), vec!["c"]);
        assert_eq!(decoded["c"].kind, ValueKind::Textarea);
        assert_eq!(decoded["c"].value, "kept");
    }

    #[test]
    fn test_missing_or_unknown_type_is_rich() {
        let blob = "<!-- field slug=\"a\" -->\nx\n<!-- /field -->\n\n\
                    <!-- field slug=\"b\" type=\"fancy\" -->\ny\n<!-- /field -->";
        let decoded = decode(blob);
        assert_eq!(decoded["a"].kind, ValueKind::Rich);
        assert_eq!(decoded["b"].kind, ValueKind::Rich);
    }

    #[test]
    fn test_invalid_slug_is_skipped() {
        let blob = encode(&[
            StructuredFieldValue::new("Bad Slug", ValueKind::Single, "x"),
            StructuredFieldValue::new("good", ValueKind::Single, "y"),
        ]);
        assert!(!blob.contains("Bad Slug"));
        assert_eq!(decode(&blob).len(), 1);
    }

    #[test]
    fn test_text_outside_markers_is_ignored() {
        let blob = "stray text\n<!-- field slug=\"a\" type=\"single\" -->\n1\n<!-- /field -->\ntrailing";
        assert_eq!(decode(blob)["a"].value, "1");
    }

    #[test]
    fn test_empty_blob() {
        assert!(decode("").is_empty());
        assert_eq!(encode(&[]), "");
    }
}
