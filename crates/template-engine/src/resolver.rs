//! Marker attributes -> field definitions

use crate::markers::TemplateMarker;
use chrono::NaiveDate;
use shared_types::{DataType, FieldDefinition, FieldKind, SchemaError};

/// Date format accepted for `minvalue` / `maxvalue` on date fields
pub const DATE_BOUND_FORMAT: &str = "%Y-%m-%d";

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Keep a bound only if it makes sense for the field's data type
fn bound(value: Option<&str>, data_type: DataType) -> Option<String> {
    let value = non_empty(value)?;
    let ok = match data_type {
        DataType::Number => value.parse::<f64>().map(|n| n.is_finite()).unwrap_or(false),
        DataType::Date => NaiveDate::parse_from_str(&value, DATE_BOUND_FORMAT).is_ok(),
        DataType::Text | DataType::Boolean => false,
    };
    ok.then_some(value)
}

/// Build the definition of one field marker under an already sanitized slug
pub fn resolve_field(marker: &TemplateMarker, slug: &str) -> Result<FieldDefinition, SchemaError> {
    let kind = marker
        .attribute("type")
        .map(FieldKind::parse)
        .unwrap_or(FieldKind::Textarea);

    let mut field = FieldDefinition::new(slug, kind)?;

    let title = non_empty(marker.attribute("title"));
    if let Some(label) = title.clone().or_else(|| non_empty(marker.attribute("label"))) {
        field.label = label;
    }

    field.hints.title = title;
    field.hints.placeholder = non_empty(marker.attribute("placeholder"));
    field.hints.description = non_empty(marker.attribute("description"));

    let data_type = field.data_type;
    field.validation.pattern = non_empty(marker.attribute("pattern"));
    field.validation.pattern_message = non_empty(marker.attribute("patternmsg"));
    field.validation.min_value = bound(marker.attribute("minvalue"), data_type);
    field.validation.max_value = bound(marker.attribute("maxvalue"), data_type);
    field.validation.length = marker
        .attribute("length")
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|n| *n > 0);

    // Renderer-only, stored verbatim
    field.passthrough.case_transform = marker.attribute("ope").map(str::to_string);
    field.passthrough.date_format = marker.attribute("frm").map(str::to_string);

    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::scan_markers;
    use pretty_assertions::assert_eq;

    fn resolve(text: &str) -> FieldDefinition {
        let markers = scan_markers(text);
        let marker = &markers[0];
        let slug = marker.field_name().to_string();
        resolve_field(marker, &slug).unwrap()
    }

    #[test]
    fn test_missing_type_defaults_to_textarea() {
        let field = resolve("[notes]");
        assert_eq!(field.kind, FieldKind::Textarea);
        assert_eq!(field.data_type, DataType::Text);
        assert_eq!(field.label, "Notes");
    }

    #[test]
    fn test_unknown_type_is_textarea() {
        assert_eq!(resolve("[x;type='checkbox']").kind, FieldKind::Textarea);
    }

    #[test]
    fn test_title_overrides_label() {
        let field = resolve("[name;type='text';title='Full name';label='Ignored']");
        assert_eq!(field.label, "Full name");
        assert_eq!(field.hints.title.as_deref(), Some("Full name"));
    }

    #[test]
    fn test_label_attribute_without_title() {
        let field = resolve("[name;label='Client']");
        assert_eq!(field.label, "Client");
        assert_eq!(field.hints.title, None);
    }

    #[test]
    fn test_number_bounds() {
        let field = resolve("[qty;type='number';minvalue='1';maxvalue='abc';length='4']");
        assert_eq!(field.data_type, DataType::Number);
        assert_eq!(field.validation.min_value.as_deref(), Some("1"));
        assert_eq!(field.validation.max_value, None);
        assert_eq!(field.validation.length, Some(4));
    }

    #[test]
    fn test_date_bounds() {
        let field = resolve("[due;type='date';minvalue='2024-01-01';maxvalue='31.12.2024']");
        assert_eq!(field.data_type, DataType::Date);
        assert_eq!(field.validation.min_value.as_deref(), Some("2024-01-01"));
        assert_eq!(field.validation.max_value, None);
    }

    #[test]
    fn test_text_fields_drop_bounds() {
        let field = resolve("[code;type='text';minvalue='1']");
        assert_eq!(field.validation.min_value, None);
    }

    #[test]
    fn test_pattern_and_hints() {
        let field = resolve(
            "[zip;type='text';pattern='[0-9]{5}';patternmsg='Five digits';placeholder='12345';description='Postal code']",
        );
        assert_eq!(field.validation.pattern.as_deref(), Some("[0-9]{5}"));
        assert_eq!(
            field.validation.pattern_message.as_deref(),
            Some("Five digits")
        );
        assert_eq!(field.hints.placeholder.as_deref(), Some("12345"));
        assert_eq!(field.hints.description.as_deref(), Some("Postal code"));
    }

    #[test]
    fn test_passthrough_is_verbatim() {
        let field = resolve("[city;type='text';ope='upper';frm='whatever it is']");
        assert_eq!(field.passthrough.case_transform.as_deref(), Some("upper"));
        assert_eq!(
            field.passthrough.date_format.as_deref(),
            Some("whatever it is")
        );
    }

    #[test]
    fn test_email_and_url_are_text() {
        assert_eq!(resolve("[e;type='email']").data_type, DataType::Text);
        assert_eq!(resolve("[u;type='url']").data_type, DataType::Text);
    }
}
