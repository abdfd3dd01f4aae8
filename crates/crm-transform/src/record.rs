//! Source rows to target records.

use std::collections::BTreeSet;

use crm_model::{
    FieldMapping, FieldValue, LoadOperation, RECORD_TYPE_FIELD, SourceRecord, TargetField,
    TargetObject, TargetRecord,
};
use tracing::{debug, warn};

use crate::convert::convert_value;

/// Applies a mapping set to source rows.
///
/// Unknown targets are ignored. Targets that cannot be written for the
/// operation are skipped with one warning per field. A selected record type
/// is stamped on every record and any column mapped to `RecordTypeId` is
/// ignored.
#[derive(Debug)]
pub struct RecordTransformer<'a> {
    object: &'a TargetObject,
    mappings: &'a [FieldMapping],
    operation: LoadOperation,
    record_type_id: Option<String>,
    warned: BTreeSet<String>,
}

impl<'a> RecordTransformer<'a> {
    pub fn new(object: &'a TargetObject, mappings: &'a [FieldMapping], operation: LoadOperation) -> Self {
        Self {
            object,
            mappings,
            operation,
            record_type_id: None,
            warned: BTreeSet::new(),
        }
    }

    pub fn with_record_type(mut self, record_type_id: Option<String>) -> Self {
        self.record_type_id = record_type_id.filter(|id| !id.trim().is_empty());
        self
    }

    pub fn transform_row(&mut self, row: &SourceRecord) -> TargetRecord {
        let mut record = TargetRecord::new();
        if let Some(record_type_id) = &self.record_type_id {
            record.insert(RECORD_TYPE_FIELD.to_string(), FieldValue::Text(record_type_id.clone()));
        }

        for mapping in self.mappings {
            if mapping.target_field == RECORD_TYPE_FIELD && self.record_type_id.is_some() {
                continue;
            }
            let Some(field) = self.object.field(&mapping.target_field) else {
                continue;
            };
            if !self.accepts(field) {
                continue;
            }
            let raw = row.get(&mapping.source_column).map_or("", String::as_str);
            if let Some(value) = convert_value(raw, field) {
                record.insert(field.name.clone(), value);
            }
        }
        record
    }

    pub fn transform_all(&mut self, rows: &[SourceRecord]) -> Vec<TargetRecord> {
        debug!(
            rows = rows.len(),
            mappings = self.mappings.len(),
            "Transforming rows"
        );
        rows.iter().map(|row| self.transform_row(row)).collect()
    }

    /// Whether `field` may carry a value for this operation.
    fn accepts(&mut self, field: &TargetField) -> bool {
        let reason = if field.calculated || field.auto_number {
            Some(format!(
                "Skipping calculated/auto-number field '{}' (calculated={}, auto_number={})",
                field.name, field.calculated, field.auto_number
            ))
        } else {
            match self.operation {
                LoadOperation::Insert if !field.createable => Some(format!(
                    "Skipping read-only field '{}' (createable=false)",
                    field.name
                )),
                // Id selects the record being updated.
                LoadOperation::Update if !field.updateable && !field.is_id() => Some(format!(
                    "Skipping read-only field '{}' (updateable=false)",
                    field.name
                )),
                _ => None,
            }
        };

        match reason {
            Some(message) => {
                if self.warned.insert(field.name.clone()) {
                    warn!("{message}");
                }
                false
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_model::{FieldType, ID_FIELD};

    fn object() -> TargetObject {
        let mut formula = TargetField::new("Score__c", "Score", FieldType::Double);
        formula.calculated = true;
        TargetObject::new(
            "Claim__c",
            "Claim",
            vec![
                TargetField::new(ID_FIELD, "Record ID", FieldType::Id).read_only(),
                TargetField::new("Name", "Claim Name", FieldType::String),
                TargetField::new(RECORD_TYPE_FIELD, "Record Type", FieldType::Reference),
                formula,
            ],
        )
    }

    fn row(pairs: &[(&str, &str)]) -> SourceRecord {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn id_is_kept_only_for_update() {
        let object = object();
        let mappings = vec![FieldMapping::new("key", ID_FIELD), FieldMapping::new("name", "Name")];
        let source = row(&[("key", "a01000000000001"), ("name", "C-1")]);

        let insert = RecordTransformer::new(&object, &mappings, LoadOperation::Insert).transform_row(&source);
        assert!(!insert.contains_key(ID_FIELD));

        let update = RecordTransformer::new(&object, &mappings, LoadOperation::Update).transform_row(&source);
        assert_eq!(update.get(ID_FIELD), Some(&FieldValue::Text("a01000000000001".to_string())));
    }

    #[test]
    fn record_type_selection_overrides_column() {
        let object = object();
        let mappings = vec![FieldMapping::new("rt", RECORD_TYPE_FIELD)];
        let source = row(&[("rt", "012000000000002")]);

        let mut transformer = RecordTransformer::new(&object, &mappings, LoadOperation::Insert)
            .with_record_type(Some("012000000000001".to_string()));
        let record = transformer.transform_row(&source);
        assert_eq!(
            record.get(RECORD_TYPE_FIELD),
            Some(&FieldValue::Text("012000000000001".to_string()))
        );

        let mut plain = RecordTransformer::new(&object, &mappings, LoadOperation::Insert);
        assert_eq!(
            plain.transform_row(&source).get(RECORD_TYPE_FIELD),
            Some(&FieldValue::Text("012000000000002".to_string()))
        );
    }

    #[test]
    fn calculated_fields_are_skipped_and_warned_once() {
        let object = object();
        let mappings = vec![FieldMapping::new("score", "Score__c")];
        let rows = vec![row(&[("score", "1.5")]), row(&[("score", "2.5")])];
        let mut transformer = RecordTransformer::new(&object, &mappings, LoadOperation::Insert);
        let records = transformer.transform_all(&rows);
        assert!(records.iter().all(TargetRecord::is_empty));
        assert_eq!(transformer.warned.len(), 1);
    }
}
