//! Raw text to typed field values.

use crm_model::{FieldType, FieldValue, TargetField};
use tracing::{debug, warn};

use crate::normalization::{
    format_date, format_datetime, is_record_id, parse_date, parse_datetime, parse_decimal,
    parse_integer, picklist, resolve_picklist,
};

const TRUE_VALUES: [&str; 5] = ["true", "yes", "1", "y", "t"];
const FALSE_VALUES: [&str; 5] = ["false", "no", "0", "n", "f"];

/// Convert one raw cell for `field`.
///
/// Returns `None` when the value is blank or cannot be represented in the
/// field's type; the caller omits the field from the record in that case.
pub fn convert_value(raw: &str, field: &TargetField) -> Option<FieldValue> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    match &field.field_type {
        t if t.is_picklist() && !field.picklist_values.is_empty() => {
            convert_picklist(value, field)
        }
        t if t.is_reference() => {
            if is_record_id(value) {
                Some(FieldValue::Text(value.to_string()))
            } else {
                warn!(
                    field = %field.name,
                    "Skipping lookup field value '{value}' - not a valid Salesforce ID"
                );
                None
            }
        }
        FieldType::Boolean => parse_bool(value).map(FieldValue::Bool),
        t if t.is_integer() => parse_integer(value).map(FieldValue::Integer),
        t if t.is_decimal() => parse_decimal(value).map(FieldValue::Decimal),
        FieldType::Date => match parse_date(value) {
            Some(date) => Some(FieldValue::Text(format_date(date))),
            None => {
                warn!(field = %field.name, "Could not parse date value: {value}");
                None
            }
        },
        FieldType::DateTime => match parse_datetime(value) {
            Some(datetime) => Some(FieldValue::Text(format_datetime(datetime))),
            None => {
                warn!(field = %field.name, "Could not parse datetime value: {value}");
                None
            }
        },
        _ => Some(FieldValue::Text(value.to_string())),
    }
}

fn convert_picklist(value: &str, field: &TargetField) -> Option<FieldValue> {
    match resolve_picklist(value, &field.picklist_values) {
        Some(matched) => {
            if matched != value {
                debug!("Picklist value '{value}' matched to '{matched}'");
            }
            Some(FieldValue::Text(matched.to_string()))
        }
        None => {
            warn!(
                "Skipping invalid picklist value '{value}' for field {}. Valid values: {}",
                field.name,
                picklist::describe_allowed(&field.picklist_values)
            );
            None
        }
    }
}

/// Case-insensitive boolean; anything outside the known spellings is `None`.
pub fn parse_bool(value: &str) -> Option<bool> {
    let lower = value.trim().to_lowercase();
    if TRUE_VALUES.contains(&lower.as_str()) {
        Some(true)
    } else if FALSE_VALUES.contains(&lower.as_str()) {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(field_type: FieldType) -> TargetField {
        TargetField::new("F__c", "F", field_type)
    }

    #[test]
    fn blank_is_none_for_every_type() {
        for t in [FieldType::String, FieldType::Boolean, FieldType::Int, FieldType::Date] {
            assert_eq!(convert_value("   ", &field(t)), None);
        }
    }

    #[test]
    fn picklist_without_values_passes_text_through() {
        assert_eq!(
            convert_value(" Anything ", &field(FieldType::Picklist)),
            Some(FieldValue::Text("Anything".to_string()))
        );
    }

    #[test]
    fn booleans() {
        let f = field(FieldType::Boolean);
        for yes in ["TRUE", "Yes", "1", "y", "t"] {
            assert_eq!(convert_value(yes, &f), Some(FieldValue::Bool(true)), "{yes}");
        }
        for no in ["false", "NO", "0", "N", "f"] {
            assert_eq!(convert_value(no, &f), Some(FieldValue::Bool(false)), "{no}");
        }
        assert_eq!(convert_value("maybe", &f), None);
    }

    #[test]
    fn other_types_keep_trimmed_text() {
        assert_eq!(
            convert_value("  a@b.com ", &field(FieldType::Email)),
            Some(FieldValue::Text("a@b.com".to_string()))
        );
        assert_eq!(
            convert_value("x", &field(FieldType::Other("encryptedstring".to_string()))),
            Some(FieldValue::Text("x".to_string()))
        );
    }
}
