//! Mapping validation.
//!
//! Checks a mapping set against the target object before any data moves:
//!
//! - every required field is mapped (error)
//! - no field receives more than one column (warning)
//! - every target exists on the object (error)
//! - targets are updateable (warning, `Id` exempt)
//!
//! A result with no errors is valid; warnings never block a load.

pub mod checks;

use crm_model::{FieldMapping, TargetObject, ValidationIssue, ValidationResult};
use tracing::info;

/// Validate a full mapping set for `object`.
pub fn validate_mapping(mappings: &[FieldMapping], object: &TargetObject) -> ValidationResult {
    info!(
        mappings = mappings.len(),
        object = %object.name,
        "Validating mappings"
    );

    let mut result = ValidationResult::default();
    for issue in checks::required::check(mappings, object)
        .into_iter()
        .chain(checks::duplicate::check(mappings, object))
        .chain(checks::field::check(mappings, object))
        .chain(checks::updateable::check(mappings, object))
    {
        result.push(issue);
    }

    info!(
        valid = result.is_valid(),
        errors = result.error_count(),
        warnings = result.warning_count(),
        "Validation complete"
    );
    result
}

/// Issues affecting a single mapping on its own: unknown target or a
/// non-updateable field. Set-level checks (required, duplicates) are not run.
pub fn validate_single_mapping(mapping: &FieldMapping, object: &TargetObject) -> Vec<ValidationIssue> {
    let Some(field) = object.field(&mapping.target_field) else {
        return checks::field::check(std::slice::from_ref(mapping), object);
    };
    checks::updateable::issue_for(field)
        .map(|issue| issue.for_column(&mapping.source_column))
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_model::{FieldType, IssueKind, TargetField};

    fn account() -> TargetObject {
        TargetObject::new(
            "Account",
            "Account",
            vec![
                TargetField::new("Id", "Account ID", FieldType::Id).read_only(),
                TargetField::new("Name", "Account Name", FieldType::String).required(),
                TargetField::new("Phone", "Account Phone", FieldType::Phone),
            ],
        )
    }

    #[test]
    fn single_mapping_checks() {
        let object = account();
        assert!(validate_single_mapping(&FieldMapping::new("Tel", "Phone"), &object).is_empty());
        assert!(validate_single_mapping(&FieldMapping::new("Key", "Id"), &object).is_empty());

        let issues = validate_single_mapping(&FieldMapping::new("Fax", "Fax"), &object);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::InvalidField);
        assert_eq!(issues[0].source_column.as_deref(), Some("Fax"));
    }

    #[test]
    fn empty_mapping_only_misses_required() {
        let result = validate_mapping(&[], &account());
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].kind, IssueKind::MissingRequired);
    }
}
