//! Targets that cannot be written on update.
//!
//! `Id` is exempt: it selects the record rather than being written.

use crm_model::{FieldMapping, IssueKind, TargetField, TargetObject, ValidationIssue};

pub fn check(mappings: &[FieldMapping], object: &TargetObject) -> Vec<ValidationIssue> {
    mappings
        .iter()
        .filter_map(|mapping| {
            let field = object.field(&mapping.target_field)?;
            issue_for(field).map(|issue| issue.for_column(&mapping.source_column))
        })
        .collect()
}

/// Warning for a single field, if it is not updateable.
pub fn issue_for(field: &TargetField) -> Option<ValidationIssue> {
    if field.updateable || field.is_id() {
        return None;
    }
    Some(
        ValidationIssue::new(
            IssueKind::NonUpdateable,
            format!("Field '{}' ({}) is not updateable", field.label, field.name),
        )
        .for_field(&field.name),
    )
}
