//! Check submitted values against the constraints declared in the template

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use shared_types::{DataType, FieldDefinition, FieldKind};
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

const DATE_FORMAT: &str = "%Y-%m-%d";

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref URL: Regex = Regex::new(r"(?i)^https?://[^\s/$.?#][^\s]*$").unwrap();
}

/// A value that does not satisfy its field's constraints
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{slug}: {message}")]
pub struct ValidationMismatch {
    pub slug: String,
    pub message: String,
}

impl ValidationMismatch {
    fn new(field: &FieldDefinition, message: impl Into<String>) -> Self {
        Self {
            slug: field.slug().to_string(),
            message: message.into(),
        }
    }
}

/// Trim number and date values; text is kept verbatim
pub fn normalize(data_type: DataType, value: &str) -> String {
    match data_type {
        DataType::Number | DataType::Date => value.trim().to_string(),
        DataType::Text | DataType::Boolean => value.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
enum Comparable {
    Number(f64),
    Date(NaiveDate),
}

fn comparable(data_type: DataType, value: &str) -> Option<Comparable> {
    match data_type {
        DataType::Number => value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Comparable::Number),
        DataType::Date => NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
            .ok()
            .map(Comparable::Date),
        DataType::Text | DataType::Boolean => None,
    }
}

/// Compiled field patterns, keyed by pattern source
///
/// Invalid patterns are remembered as `None` so they are reported once.
#[derive(Debug, Default)]
pub struct PatternCache {
    compiled: HashMap<String, Option<Regex>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&mut self, field: &FieldDefinition, pattern: &str) -> Option<&Regex> {
        self.compiled
            .entry(pattern.to_string())
            .or_insert_with(|| match Regex::new(&format!("^(?:{})$", pattern)) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    warn!(slug = field.slug(), error = %e, "ignoring invalid field pattern");
                    None
                }
            })
            .as_ref()
    }
}

fn check_pattern(
    field: &FieldDefinition,
    value: &str,
    patterns: &mut PatternCache,
) -> Result<(), ValidationMismatch> {
    let Some(pattern) = field.validation.pattern.as_deref() else {
        return Ok(());
    };
    let Some(regex) = patterns.get(field, pattern) else {
        return Ok(());
    };
    if regex.is_match(value) {
        return Ok(());
    }
    let message = field
        .validation
        .pattern_message
        .clone()
        .unwrap_or_else(|| format!("{} does not match the expected format", field.label));
    Err(ValidationMismatch::new(field, message))
}

fn check_bounds(field: &FieldDefinition, value: Comparable) -> Result<(), ValidationMismatch> {
    let bound = |raw: &Option<String>| {
        raw.as_deref()
            .and_then(|b| comparable(field.data_type, b))
    };

    if let Some(min) = bound(&field.validation.min_value) {
        if value < min {
            return Err(ValidationMismatch::new(
                field,
                format!(
                    "{} must be at least {}",
                    field.label,
                    field.validation.min_value.as_deref().unwrap_or_default()
                ),
            ));
        }
    }
    if let Some(max) = bound(&field.validation.max_value) {
        if value > max {
            return Err(ValidationMismatch::new(
                field,
                format!(
                    "{} must be at most {}",
                    field.label,
                    field.validation.max_value.as_deref().unwrap_or_default()
                ),
            ));
        }
    }
    Ok(())
}

/// Validate one submitted value
///
/// Empty values always pass. The first failing check is reported.
///
/// # Errors
///
/// Returns a [`ValidationMismatch`] naming the field when the value breaks a
/// length, shape, type, pattern or bound constraint.
pub fn validate(field: &FieldDefinition, value: &str) -> Result<(), ValidationMismatch> {
    validate_with(field, value, &mut PatternCache::new())
}

/// [`validate`] reusing patterns compiled by earlier calls
pub fn validate_with(
    field: &FieldDefinition,
    value: &str,
    patterns: &mut PatternCache,
) -> Result<(), ValidationMismatch> {
    if value.trim().is_empty() {
        return Ok(());
    }

    if let Some(max) = field.validation.length {
        if value.chars().count() > max as usize {
            return Err(ValidationMismatch::new(
                field,
                format!("{} must be at most {} characters", field.label, max),
            ));
        }
    }

    match field.kind {
        FieldKind::Email if !EMAIL.is_match(value.trim()) => {
            return Err(ValidationMismatch::new(
                field,
                format!("{} must be an email address", field.label),
            ));
        }
        FieldKind::Url if !URL.is_match(value.trim()) => {
            return Err(ValidationMismatch::new(
                field,
                format!("{} must be a web address", field.label),
            ));
        }
        _ => {}
    }

    let typed = match field.data_type {
        DataType::Number | DataType::Date => match comparable(field.data_type, value) {
            Some(typed) => Some(typed),
            None => {
                let expected = if field.data_type == DataType::Number {
                    "a number"
                } else {
                    "a date (YYYY-MM-DD)"
                };
                return Err(ValidationMismatch::new(
                    field,
                    format!("{} must be {}", field.label, expected),
                ));
            }
        },
        DataType::Text | DataType::Boolean => None,
    };

    check_pattern(field, value, patterns)?;

    match typed {
        Some(typed) => check_bounds(field, typed),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn field(kind: FieldKind) -> FieldDefinition {
        FieldDefinition::new("amount", kind).unwrap()
    }

    #[test]
    fn test_empty_always_passes() {
        let mut f = field(FieldKind::Number);
        f.validation.pattern = Some("[0-9]{3}".into());
        assert!(validate(&f, "").is_ok());
        assert!(validate(&f, "   ").is_ok());
    }

    #[test]
    fn test_pattern_is_full_match() {
        let mut f = field(FieldKind::Text);
        f.validation.pattern = Some("[0-9]{3}".into());
        assert!(validate(&f, "123").is_ok());
        assert!(validate(&f, "1234").is_err());
        assert!(validate(&f, "a123").is_err());
    }

    #[test]
    fn test_pattern_message_is_used() {
        let mut f = field(FieldKind::Text);
        f.validation.pattern = Some("[A-Z]+".into());
        f.validation.pattern_message = Some("Capitals only".into());
        let err = validate(&f, "abc").unwrap_err();
        assert_eq!(err.slug, "amount");
        assert_eq!(err.message, "Capitals only");
    }

    #[test]
    fn test_invalid_pattern_is_ignored() {
        let mut f = field(FieldKind::Text);
        f.validation.pattern = Some("([unclosed".into());
        assert!(validate(&f, "anything").is_ok());
    }

    #[test]
    fn test_numeric_bounds() {
        let mut f = field(FieldKind::Number);
        f.validation.min_value = Some("1".into());
        f.validation.max_value = Some("10".into());
        assert!(validate(&f, "5").is_ok());
        assert!(validate(&f, " 10 ").is_ok());
        assert!(validate(&f, "0.5").is_err());
        assert!(validate(&f, "11").is_err());
        assert!(validate(&f, "ten").is_err());
    }

    #[test]
    fn test_non_finite_numbers_are_rejected() {
        let mut f = field(FieldKind::Number);
        f.validation.min_value = Some("0".into());
        f.validation.max_value = Some("10".into());
        for value in ["NaN", "nan", "inf", "-infinity"] {
            let err = validate(&f, value).unwrap_err();
            assert_eq!(err.message, "Amount must be a number");
        }
    }

    #[test]
    fn test_pattern_cache_reuses_compiled_patterns() {
        let mut f = field(FieldKind::Text);
        f.validation.pattern = Some("[a-z]+".into());
        let mut bad = field(FieldKind::Text);
        bad.validation.pattern = Some("(".into());

        let mut patterns = PatternCache::new();
        assert!(validate_with(&f, "abc", &mut patterns).is_ok());
        assert!(validate_with(&f, "ABC", &mut patterns).is_err());
        assert!(validate_with(&bad, "anything", &mut patterns).is_ok());
        assert!(validate_with(&bad, "again", &mut patterns).is_ok());
        assert_eq!(patterns.compiled.len(), 2);
    }

    #[test]
    fn test_date_bounds() {
        let mut f = field(FieldKind::Date);
        f.validation.min_value = Some("2024-01-01".into());
        assert!(validate(&f, "2024-06-30").is_ok());
        assert!(validate(&f, "2023-12-31").is_err());
        assert!(validate(&f, "30/06/2024").is_err());
    }

    #[test]
    fn test_length_counts_characters() {
        let mut f = field(FieldKind::Text);
        f.validation.length = Some(3);
        assert!(validate(&f, "äöü").is_ok());
        assert!(validate(&f, "äöüß").is_err());
    }

    #[test]
    fn test_email_and_url_shapes() {
        let email = field(FieldKind::Email);
        assert!(validate(&email, "ada@example.com").is_ok());
        assert!(validate(&email, "ada.example.com").is_err());

        let url = field(FieldKind::Url);
        assert!(validate(&url, "https://example.com/a?b=c").is_ok());
        assert!(validate(&url, "example dot com").is_err());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(DataType::Number, " 42 "), "42");
        assert_eq!(normalize(DataType::Date, "2024-01-01\n"), "2024-01-01");
        assert_eq!(normalize(DataType::Text, " keep "), " keep ");
    }
}
