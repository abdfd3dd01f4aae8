//! CSV import templates generated from an object's schema.
//!
//! A template is a header row of the fields a user should fill in, plus an
//! optional second row describing what each column expects.

use std::path::Path;

use crm_model::{FieldType, RECORD_TYPE_FIELD, TargetField, TargetObject};
use csv::Writer;

use crate::error::{IngestError, Result};

/// Audit fields the platform populates itself.
const SYSTEM_FIELDS: &[&str] = &[
    "Id",
    "CreatedDate",
    "CreatedById",
    "LastModifiedDate",
    "LastModifiedById",
    "SystemModstamp",
];

/// Optional fields worth offering when optional columns are requested.
const COMMON_OPTIONAL_FIELDS: &[&str] = &[
    "Description",
    "Comments",
    "Notes",
    "Status",
    "Type",
    "Priority",
    "Category",
    "Owner",
    "OwnerId",
    "Phone",
    "Email",
    "Website",
    "Industry",
    "BillingStreet",
    "BillingCity",
    "BillingState",
    "BillingPostalCode",
    "BillingCountry",
    "ShippingStreet",
    "ShippingCity",
    "ShippingState",
    "ShippingPostalCode",
    "ShippingCountry",
];

const PICKLIST_PREVIEW: usize = 3;

/// Fields that belong in a template, required first and then by name.
pub fn select_template_fields(object: &TargetObject, include_optional: bool) -> Vec<&TargetField> {
    let has_record_types = !object.record_types.is_empty();
    let mut selected: Vec<&TargetField> = object
        .fields
        .iter()
        .filter(|field| !SYSTEM_FIELDS.contains(&field.name.as_str()))
        .filter(|field| field.is_writable())
        .filter(|field| {
            field.required
                || (include_optional && COMMON_OPTIONAL_FIELDS.contains(&field.name.as_str()))
                || (field.name == RECORD_TYPE_FIELD && has_record_types)
        })
        .collect();
    selected.sort_by(|a, b| (!a.required, &a.name).cmp(&(!b.required, &b.name)));
    selected
}

/// Documentation cell for one field, e.g. `REQUIRED | Picklist: Open/Closed`.
pub fn describe_field(field: &TargetField) -> String {
    let mut parts: Vec<String> = Vec::new();
    if field.required {
        parts.push("REQUIRED".to_string());
    }

    let hint = match &field.field_type {
        FieldType::Picklist | FieldType::MultiPicklist => {
            if field.picklist_values.is_empty() {
                "Picklist".to_string()
            } else {
                let mut values = field
                    .picklist_values
                    .iter()
                    .take(PICKLIST_PREVIEW)
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join("/");
                if field.picklist_values.len() > PICKLIST_PREVIEW {
                    values.push_str("/...");
                }
                format!("Picklist: {values}")
            }
        }
        FieldType::Reference | FieldType::MasterDetail => {
            let targets = if field.reference_to.is_empty() {
                "ID".to_string()
            } else {
                field.reference_to.join(", ")
            };
            format!("Lookup ({targets} ID)")
        }
        FieldType::Boolean => "TRUE/FALSE".to_string(),
        FieldType::Date => "Date (YYYY-MM-DD)".to_string(),
        FieldType::DateTime => "DateTime (YYYY-MM-DD HH:MM:SS)".to_string(),
        FieldType::Currency | FieldType::Double | FieldType::Percent => "Number".to_string(),
        FieldType::Email => "Email address".to_string(),
        FieldType::Phone => "Phone number".to_string(),
        FieldType::Url => "URL".to_string(),
        FieldType::String | FieldType::TextArea => match field.length {
            Some(length) if length > 0 => format!("Text (max {length} chars)"),
            _ => "Text".to_string(),
        },
        other => other.as_str().to_string(),
    };
    parts.push(hint);
    parts.join(" | ")
}

/// Write a template for `object` to `path` and return its header.
pub fn write_template(
    object: &TargetObject,
    path: &Path,
    include_optional: bool,
    include_sample_row: bool,
) -> Result<Vec<String>> {
    tracing::info!(object = %object.name, "Generating CSV template");

    let fields = select_template_fields(object, include_optional);
    if fields.is_empty() {
        return Err(IngestError::NoTemplateFields {
            object: object.name.clone(),
        });
    }
    let headers: Vec<String> = fields.iter().map(|field| field.name.clone()).collect();

    let write_error = |source: csv::Error| IngestError::TemplateWrite {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = Writer::from_path(path).map_err(write_error)?;
    writer.write_record(&headers).map_err(write_error)?;
    if include_sample_row {
        let row: Vec<String> = fields.iter().map(|field| describe_field(field)).collect();
        writer.write_record(&row).map_err(write_error)?;
    }
    writer
        .flush()
        .map_err(|e| write_error(csv::Error::from(e)))?;

    let shown = headers.iter().take(10).cloned().collect::<Vec<_>>().join(", ");
    let more = if headers.len() > 10 { "..." } else { "" };
    tracing::info!(
        path = %path.display(),
        "Template contains {} fields: {shown}{more}",
        headers.len()
    );
    Ok(headers)
}
