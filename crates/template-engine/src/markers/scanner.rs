//! Single-pass marker scanner
//!
//! The scanner walks the text once, left to right. A candidate starts at every
//! `[`; if it turns out malformed it is dropped and scanning resumes at the
//! next `[` after the candidate's opening bracket. A quoted value always ends
//! at the first following quote, so overlapping candidates never fall into
//! step with each other and the total work stays linear in the input length.

use super::{MarkerKind, MarkerScope, TemplateMarker};
use std::collections::HashSet;
use tracing::debug;

const BLOCK_BEGIN: &str = "begin";
const BLOCK_END: &str = "end";
const BLOCK_TABLE_ROW: &str = "tbs:row";

/// A bracketed token before scope resolution
#[derive(Debug)]
struct RawMarker<'a> {
    slug: &'a str,
    attributes: Vec<(String, String)>,
    /// One past the closing bracket
    end: usize,
}

#[derive(Debug)]
struct Malformed {
    at: usize,
    reason: &'static str,
}

fn is_slug_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.'
}

fn is_key_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b':' || b == b'-'
}

fn is_unquoted_value_byte(b: u8) -> bool {
    !matches!(b, b';' | b']' | b'[' | b'\'') && !b.is_ascii_whitespace()
}

struct Cursor<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if pred(b)) {
            self.pos += 1;
        }
        &self.text[start..self.pos]
    }

    fn malformed(&self, reason: &'static str) -> Malformed {
        Malformed {
            at: self.pos,
            reason,
        }
    }

    fn value(&mut self) -> Result<&'a str, Malformed> {
        if self.peek() == Some(b'\'') {
            let open = self.pos + 1;
            match self.text[open..].find('\'') {
                Some(len) => {
                    self.pos = open + len + 1;
                    Ok(&self.text[open..open + len])
                }
                None => Err(self.malformed("unterminated quoted value")),
            }
        } else {
            let value = self.take_while(is_unquoted_value_byte);
            match self.peek() {
                Some(b'[') => Err(self.malformed("bracket inside value")),
                Some(b'\'') => Err(self.malformed("stray quote in value")),
                _ => Ok(value),
            }
        }
    }
}

/// Parse one candidate whose `[` sits at `start`
fn parse_marker(text: &str, start: usize) -> Result<RawMarker<'_>, Malformed> {
    let mut cur = Cursor {
        text,
        bytes: text.as_bytes(),
        pos: start + 1,
    };

    let slug = cur.take_while(is_slug_byte);
    if slug.is_empty() {
        return Err(cur.malformed("empty slug"));
    }

    let mut attributes = Vec::new();
    loop {
        cur.skip_whitespace();
        match cur.peek() {
            Some(b']') => {
                return Ok(RawMarker {
                    slug,
                    attributes,
                    end: cur.pos + 1,
                });
            }
            Some(b';') => {
                cur.pos += 1;
                cur.skip_whitespace();
                let key = cur.take_while(is_key_byte);
                if key.is_empty() {
                    return Err(cur.malformed("missing attribute key"));
                }
                cur.skip_whitespace();
                if cur.peek() != Some(b'=') {
                    return Err(cur.malformed("missing '='"));
                }
                cur.pos += 1;
                cur.skip_whitespace();
                let value = cur.value()?;
                attributes.push((key.to_ascii_lowercase(), value.to_string()));
            }
            Some(_) => return Err(cur.malformed("unexpected character")),
            None => return Err(cur.malformed("unterminated marker")),
        }
    }
}

/// Tracks which repeaters are open while scanning
#[derive(Default)]
struct ScopeTracker {
    open: Vec<String>,
    table_rows: HashSet<String>,
}

impl ScopeTracker {
    fn resolve(&mut self, raw: RawMarker<'_>, offset: usize) -> Option<TemplateMarker> {
        let block = raw
            .attributes
            .iter()
            .rev()
            .find(|(k, _)| k == "block")
            .map(|(_, v)| v.trim().to_ascii_lowercase());
        let (prefix, dotted) = match raw.slug.split_once('.') {
            Some((prefix, _)) => (prefix, true),
            None => (raw.slug, false),
        };

        let (scope, kind) = match block.as_deref() {
            Some(BLOCK_BEGIN) => {
                if self.open.iter().any(|s| s == prefix) {
                    debug!(slug = prefix, offset, "block already open, ignoring second begin");
                } else {
                    self.open.push(prefix.to_string());
                }
                (MarkerScope::TopLevel, MarkerKind::BlockBegin)
            }
            Some(BLOCK_END) => match self.open.iter().rposition(|s| s == prefix) {
                Some(idx) => {
                    self.open.remove(idx);
                    (MarkerScope::TopLevel, MarkerKind::BlockEnd)
                }
                None => {
                    debug!(slug = prefix, offset, "block end without begin, skipped");
                    return None;
                }
            },
            Some(BLOCK_TABLE_ROW) => {
                self.table_rows.insert(prefix.to_string());
                let scope = MarkerScope::TableRow(prefix.to_string());
                if dotted {
                    (scope, MarkerKind::Field)
                } else {
                    (scope, MarkerKind::BlockBegin)
                }
            }
            _ if dotted => {
                if self.table_rows.contains(prefix) {
                    (MarkerScope::TableRow(prefix.to_string()), MarkerKind::Field)
                } else {
                    if !self.open.iter().any(|s| s == prefix) {
                        debug!(slug = raw.slug, offset, "nested field outside an open block");
                    }
                    (MarkerScope::Repeater(prefix.to_string()), MarkerKind::Field)
                }
            }
            _ => (MarkerScope::TopLevel, MarkerKind::Field),
        };

        Some(TemplateMarker {
            slug: raw.slug.to_string(),
            attributes: raw.attributes,
            scope,
            kind,
            offset,
        })
    }
}

/// Extract every well-formed marker from flattened template text
///
/// Malformed markers are skipped; the scan itself never fails.
pub fn scan_markers(text: &str) -> Vec<TemplateMarker> {
    let mut markers = Vec::new();
    let mut scopes = ScopeTracker::default();
    let mut pos = 0;

    while let Some(rel) = text[pos..].find('[') {
        let start = pos + rel;
        match parse_marker(text, start) {
            Ok(raw) => {
                pos = raw.end;
                if let Some(marker) = scopes.resolve(raw, start) {
                    markers.push(marker);
                }
            }
            Err(Malformed { at, reason }) => {
                debug!(offset = start, at, reason, "skipping malformed marker");
                pos = start + 1;
            }
        }
    }

    if !scopes.open.is_empty() {
        debug!(open = ?scopes.open, "blocks left open at end of template");
    }

    markers
}
