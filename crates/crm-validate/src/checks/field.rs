//! Targets that do not exist on the object.

use crm_model::{FieldMapping, IssueKind, TargetObject, ValidationIssue};

pub fn check(mappings: &[FieldMapping], object: &TargetObject) -> Vec<ValidationIssue> {
    mappings
        .iter()
        .filter(|mapping| !object.has_field(&mapping.target_field))
        .map(|mapping| {
            ValidationIssue::new(
                IssueKind::InvalidField,
                format!(
                    "Target field '{}' does not exist on {}",
                    mapping.target_field, object.name
                ),
            )
            .for_field(&mapping.target_field)
            .for_column(&mapping.source_column)
        })
        .collect()
}
