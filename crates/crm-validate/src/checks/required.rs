//! Required fields must receive a value.

use std::collections::BTreeSet;

use crm_model::{FieldMapping, IssueKind, TargetObject, ValidationIssue};

/// One error per required field that no mapping targets.
pub fn check(mappings: &[FieldMapping], object: &TargetObject) -> Vec<ValidationIssue> {
    let mapped: BTreeSet<&str> = mappings.iter().map(|m| m.target_field.as_str()).collect();

    object
        .required_fields()
        .filter(|field| !mapped.contains(field.name.as_str()))
        .map(|field| {
            ValidationIssue::new(
                IssueKind::MissingRequired,
                format!(
                    "Required field '{}' ({}) is not mapped",
                    field.label, field.name
                ),
            )
            .for_field(&field.name)
        })
        .collect()
}
