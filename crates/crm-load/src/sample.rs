//! Previews of records already stored in the org.

use std::collections::BTreeSet;

use crm_model::{ID_FIELD, RECORD_TYPE_FIELD, TargetObject};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::api::CrmApi;
use crate::error::{LoadError, Result};
use crate::metadata::soql_literal;
use crate::session::SharedSession;

/// Default number of records fetched for a preview.
pub const DEFAULT_SAMPLE_LIMIT: usize = 20;

/// Createable fields added after the required and common ones.
const MAX_ADDITIONAL_FIELDS: usize = 10;

/// System-managed fields never listed among the required ones.
const SYSTEM_FIELDS: &[&str] = &[
    ID_FIELD,
    "CreatedDate",
    "CreatedById",
    "LastModifiedDate",
    "LastModifiedById",
    "SystemModstamp",
    "IsDeleted",
];

const COMMON_FIELDS: &[&str] = &["CreatedDate", "LastModifiedDate", "OwnerId", RECORD_TYPE_FIELD];

/// Records returned by a preview query, without the `attributes` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordSample {
    pub fields: Vec<String>,
    pub records: Vec<Map<String, Value>>,
    /// Matching records in the org, which may exceed `records.len()`.
    pub total_size: u64,
}

/// Fields worth showing for `object`, in display order: `Id`, `Name`, the
/// required fields, common audit fields, then up to ten createable fields.
pub fn select_preview_fields(object: &TargetObject, include_all_required: bool) -> Vec<String> {
    let mut selected: Vec<String> = Vec::new();
    for name in [ID_FIELD, "Name"] {
        if object.has_field(name) {
            push_unique(&mut selected, name);
        }
    }
    if include_all_required {
        for field in object.required_fields() {
            if !SYSTEM_FIELDS.contains(&field.name.as_str()) {
                push_unique(&mut selected, &field.name);
            }
        }
    }
    for name in COMMON_FIELDS {
        if object.has_field(name) {
            push_unique(&mut selected, name);
        }
    }
    let extra: Vec<&str> = object
        .createable_fields()
        .map(|field| field.name.as_str())
        .filter(|name| !selected.iter().any(|s| s == name))
        .take(MAX_ADDITIONAL_FIELDS)
        .collect();
    for name in extra {
        push_unique(&mut selected, name);
    }

    debug!(object = %object.name, fields = selected.len(), include_all_required, "Selected preview fields");
    selected
}

fn push_unique(selected: &mut Vec<String>, name: &str) {
    if !selected.iter().any(|s| s == name) {
        selected.push(name.to_string());
    }
}

/// Run `SELECT fields FROM object [WHERE RecordTypeId = ...] LIMIT limit`.
pub fn sample_records<C: CrmApi>(
    session: &SharedSession<C>,
    object: &str,
    fields: &[String],
    limit: usize,
    record_type_id: Option<&str>,
) -> Result<RecordSample> {
    let soql = sample_query(object, fields, limit, record_type_id);
    let payload = session.with_session(|api| api.query(&soql))?;

    let total_size = payload.get("totalSize").and_then(Value::as_u64).unwrap_or(0);
    let rows = match payload.get("records") {
        Some(Value::Array(rows)) => rows.as_slice(),
        Some(other) => {
            return Err(LoadError::InvalidResponse(format!(
                "query records is not an array: {other}"
            )));
        }
        None => &[],
    };
    let records: Vec<Map<String, Value>> = rows
        .iter()
        .filter_map(Value::as_object)
        .map(|row| {
            row.iter()
                .filter(|(key, _)| key.as_str() != "attributes")
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .collect();

    info!(object, records = records.len(), total_size, "Fetched sample records");
    Ok(RecordSample {
        fields: fields.to_vec(),
        records,
        total_size,
    })
}

fn sample_query(object: &str, fields: &[String], limit: usize, record_type_id: Option<&str>) -> String {
    let mut soql = format!("SELECT {} FROM {object}", fields.join(", "));
    if let Some(id) = record_type_id {
        soql.push_str(&format!(" WHERE {RECORD_TYPE_FIELD} = {}", soql_literal(id)));
    }
    soql.push_str(&format!(" LIMIT {limit}"));
    soql
}

/// Preview `object` with layout fields when given, else the selected fields.
///
/// Layout fields the object does not have are skipped. An empty field list
/// returns an empty sample without querying.
pub fn sample_object<C: CrmApi>(
    session: &SharedSession<C>,
    object: &TargetObject,
    limit: usize,
    record_type_id: Option<&str>,
    layout_fields: Option<&[String]>,
) -> Result<RecordSample> {
    let fields: Vec<String> = match layout_fields {
        Some(layout) if !layout.is_empty() => layout
            .iter()
            .filter(|name| object.has_field(name))
            .cloned()
            .collect(),
        _ => select_preview_fields(object, true),
    };
    if fields.is_empty() {
        warn!(object = %object.name, "No queryable fields for preview");
        return Ok(RecordSample::default());
    }
    sample_records(session, &object.name, &fields, limit, record_type_id)
}

/// Field names placed on the page layout of `object`, sorted.
///
/// Uses the layout assigned to `record_type_id` when given, else the
/// object's first layout. Returns an empty list when no layout is found.
pub fn fetch_layout_fields<C: CrmApi>(
    session: &SharedSession<C>,
    object: &str,
    record_type_id: Option<&str>,
) -> Result<Vec<String>> {
    let soql = match record_type_id {
        Some(id) => format!(
            "SELECT LayoutId FROM ProfileLayout WHERE RecordTypeId = {} LIMIT 1",
            soql_literal(id)
        ),
        None => format!(
            "SELECT Id FROM Layout WHERE EntityDefinitionId = {} AND Name LIKE '%Layout%' LIMIT 1",
            soql_literal(object)
        ),
    };
    let assignments = session.with_session(|api| api.tooling_query(&soql))?;
    let Some(layout_id) = first_record(&assignments).and_then(|record| {
        record
            .get("LayoutId")
            .or_else(|| record.get("Id"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }) else {
        warn!(object, record_type = record_type_id.unwrap_or("default"), "No page layout found");
        return Ok(Vec::new());
    };

    let soql = format!("SELECT Metadata FROM Layout WHERE Id = {}", soql_literal(&layout_id));
    let layout = session.with_session(|api| api.tooling_query(&soql))?;
    let fields = first_record(&layout)
        .and_then(|record| record.get("Metadata"))
        .map(layout_field_names)
        .unwrap_or_default();
    info!(object, layout = %layout_id, fields = fields.len(), "Fetched page layout fields");
    Ok(fields)
}

fn first_record(payload: &Value) -> Option<&Value> {
    payload.get("records")?.as_array()?.first()
}

/// Fields in `layoutSections[].layoutColumns[].layoutItems[].field`.
fn layout_field_names(metadata: &Value) -> Vec<String> {
    let items = |value: &Value, key: &str| -> Vec<Value> {
        value.get(key).and_then(Value::as_array).cloned().unwrap_or_default()
    };
    let mut names = BTreeSet::new();
    for section in items(metadata, "layoutSections") {
        for column in items(&section, "layoutColumns") {
            for item in items(&column, "layoutItems") {
                if let Some(field) = item.get("field").and_then(Value::as_str) {
                    names.insert(field.to_string());
                }
            }
        }
    }
    names.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_model::{FieldType, TargetField};
    use serde_json::json;

    #[test]
    fn query_text() {
        let fields = vec!["Id".to_string(), "Name".to_string()];
        assert_eq!(
            sample_query("Account", &fields, 20, None),
            "SELECT Id, Name FROM Account LIMIT 20"
        );
        assert_eq!(
            sample_query("Account", &fields, 5, Some("012000000000001AAA")),
            "SELECT Id, Name FROM Account WHERE RecordTypeId = '012000000000001AAA' LIMIT 5"
        );
    }

    #[test]
    fn layout_fields_are_sorted_and_unique() {
        let metadata = json!({
            "layoutSections": [
                {"layoutColumns": [
                    {"layoutItems": [{"field": "Phone"}, {"field": "Name"}, {"emptySpace": true}]},
                    {"layoutItems": [{"field": "Phone"}]}
                ]},
                {"layoutColumns": []}
            ]
        });
        assert_eq!(layout_field_names(&metadata), vec!["Name", "Phone"]);
        assert!(layout_field_names(&json!({})).is_empty());
    }

    #[test]
    fn extra_fields_are_capped() {
        let fields = (0..15)
            .map(|i| TargetField::new(format!("Field{i:02}__c"), format!("Field {i}"), FieldType::String))
            .collect();
        let object = TargetObject::new("Thing__c", "Thing", fields);
        let selected = select_preview_fields(&object, true);
        assert_eq!(selected.len(), MAX_ADDITIONAL_FIELDS);
        assert_eq!(selected[0], "Field00__c");
    }
}
