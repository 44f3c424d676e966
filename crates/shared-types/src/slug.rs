//! Slug rules shared by the schema model and the content codec
//!
//! A slug is the machine key of a field or repeater. Only lowercase ASCII
//! letters, digits and underscores are allowed (`^[a-z0-9_]+$`).

/// Returns true if `slug` is non-empty and uses only `[a-z0-9_]`
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

/// Reduce a raw token to the safe-key alphabet
///
/// ASCII letters are lowercased, every character outside `[a-z0-9_]` is
/// dropped. Returns `None` when nothing is left.
pub fn sanitize_slug(raw: &str) -> Option<String> {
    let slug: String = raw
        .chars()
        .filter_map(|c| {
            let c = c.to_ascii_lowercase();
            (c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_').then_some(c)
        })
        .collect();

    if slug.is_empty() {
        None
    } else {
        Some(slug)
    }
}

/// Turn a slug into a readable default label (`full_name` -> `Full name`)
pub fn humanize_slug(slug: &str) -> String {
    let spaced = slug.replace('_', " ");
    let trimmed = spaced.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
