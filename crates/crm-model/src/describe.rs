//! Parsing of describe payloads into schema snapshots.

use serde::Deserialize;

use crate::error::{ModelError, Result};
use crate::schema::{FieldType, ObjectSummary, RecordType, TargetField, TargetObject};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeObject {
    name: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    label_plural: Option<String>,
    #[serde(default)]
    custom: bool,
    #[serde(default)]
    fields: Vec<DescribeField>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeField {
    name: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(rename = "type", default)]
    field_type: Option<String>,
    #[serde(default)]
    length: Option<u32>,
    #[serde(default = "default_true")]
    nillable: bool,
    #[serde(default)]
    createable: bool,
    #[serde(default)]
    updateable: bool,
    #[serde(default)]
    calculated: bool,
    #[serde(default)]
    auto_number: bool,
    #[serde(default)]
    reference_to: Vec<String>,
    #[serde(default)]
    picklist_values: Vec<DescribePicklistValue>,
}

#[derive(Debug, Deserialize)]
struct DescribePicklistValue {
    value: String,
}

#[derive(Debug, Deserialize)]
struct DescribeGlobal {
    #[serde(default)]
    sobjects: Vec<DescribeGlobalEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeGlobalEntry {
    name: String,
    label: String,
    #[serde(default)]
    label_plural: Option<String>,
    #[serde(default)]
    custom: bool,
    #[serde(default)]
    queryable: bool,
}

/// Row returned by the record type SOQL query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecordTypeRow {
    id: String,
    #[serde(default)]
    developer_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default = "default_true")]
    is_active: bool,
}

fn default_true() -> bool {
    true
}

impl From<DescribeField> for TargetField {
    fn from(raw: DescribeField) -> Self {
        let field_type: FieldType = raw
            .field_type
            .as_deref()
            .unwrap_or("string")
            .parse()
            .unwrap_or(FieldType::String);
        TargetField {
            label: raw.label.unwrap_or_else(|| raw.name.clone()),
            name: raw.name,
            field_type,
            length: raw.length.filter(|len| *len > 0),
            required: !raw.nillable,
            createable: raw.createable,
            updateable: raw.updateable,
            calculated: raw.calculated,
            auto_number: raw.auto_number,
            reference_to: raw.reference_to,
            picklist_values: raw
                .picklist_values
                .into_iter()
                .map(|entry| entry.value)
                .collect(),
        }
    }
}

impl TargetObject {
    /// Build a schema snapshot from an object describe payload.
    ///
    /// `required` is derived from `nillable`. Labels default to the API name.
    pub fn from_describe(payload: &serde_json::Value, record_types: Vec<RecordType>) -> Result<Self> {
        let raw: DescribeObject = serde_json::from_value(payload.clone())
            .map_err(|err| ModelError::InvalidDescribe(err.to_string()))?;
        let label = raw.label.unwrap_or_else(|| raw.name.clone());
        Ok(TargetObject {
            label_plural: raw.label_plural.unwrap_or_else(|| label.clone()),
            label,
            name: raw.name,
            custom: raw.custom,
            fields: raw.fields.into_iter().map(TargetField::from).collect(),
            record_types,
        })
    }

    /// Parse an object describe payload from JSON text.
    pub fn from_describe_str(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_describe(&value, Vec::new())
    }
}

/// Parse the `records` array of a record type query.
pub fn parse_record_types(payload: &serde_json::Value) -> Result<Vec<RecordType>> {
    let Some(records) = payload.get("records").and_then(|r| r.as_array()) else {
        return Ok(Vec::new());
    };
    records
        .iter()
        .map(|record| {
            let row: RecordTypeRow = serde_json::from_value(record.clone())
                .map_err(|err| ModelError::InvalidDescribe(err.to_string()))?;
            let name = row.name.unwrap_or_default();
            Ok(RecordType {
                id: row.id,
                developer_name: row.developer_name.unwrap_or_else(|| name.clone()),
                name,
                is_active: row.is_active,
            })
        })
        .collect()
}

/// Parse a global describe payload into the object catalog.
///
/// Only queryable objects are kept. The result is sorted by label.
pub fn parse_describe_global(
    payload: &serde_json::Value,
    include_custom: bool,
    include_standard: bool,
) -> Result<Vec<ObjectSummary>> {
    let raw: DescribeGlobal = serde_json::from_value(payload.clone())
        .map_err(|err| ModelError::InvalidDescribe(err.to_string()))?;
    let mut objects: Vec<ObjectSummary> = raw
        .sobjects
        .into_iter()
        .filter(|entry| {
            let wanted = if entry.custom {
                include_custom
            } else {
                include_standard
            };
            wanted && entry.queryable
        })
        .map(|entry| ObjectSummary {
            label_plural: entry.label_plural.unwrap_or_else(|| entry.label.clone()),
            name: entry.name,
            label: entry.label,
            custom: entry.custom,
            queryable: entry.queryable,
        })
        .collect();
    objects.sort_by(|a, b| a.label.cmp(&b.label));
    Ok(objects)
}
