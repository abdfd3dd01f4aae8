//! Several columns feeding the same field.

use crm_model::{FieldMapping, IssueKind, TargetObject, ValidationIssue};

/// One warning per target field mapped more than once, in order of first
/// appearance.
pub fn check(mappings: &[FieldMapping], object: &TargetObject) -> Vec<ValidationIssue> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for mapping in mappings {
        match counts.iter_mut().find(|(target, _)| *target == mapping.target_field) {
            Some((_, count)) => *count += 1,
            None => counts.push((mapping.target_field.as_str(), 1)),
        }
    }

    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(target, _)| {
            let label = object.field(target).map_or(target, |field| field.label.as_str());
            ValidationIssue::new(
                IssueKind::DuplicateMapping,
                format!("Multiple source columns mapped to '{label}' ({target})"),
            )
            .for_field(target)
        })
        .collect()
}
