pub mod describe;
pub mod error;
pub mod load;
pub mod mapping;
pub mod schema;
pub mod source;
pub mod validation;

pub use describe::{parse_describe_global, parse_record_types};
pub use error::{ModelError, Result};
pub use load::{FieldValue, LoadOperation, LoadResult, RowError, TargetRecord};
pub use mapping::{
    CONFIGURATION_VERSION, DIRECT_MAPPING, FieldMapping, MappingCandidate, MappingConfiguration,
    MatchMethod, SourceFileSignature, WARN_ON_MISMATCH,
};
pub use schema::{
    FieldType, ID_FIELD, ObjectSummary, RECORD_TYPE_FIELD, RecordType, TargetField, TargetObject,
    search_objects,
};
pub use source::{InferredType, SourceColumn, SourceDataset, SourceRecord};
pub use validation::{IssueKind, IssueSeverity, ValidationIssue, ValidationResult};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_result_counts() {
        let mut result = ValidationResult::default();
        result.push(ValidationIssue::new(
            IssueKind::MissingRequired,
            "Required field 'Name' (Name) is not mapped",
        ));
        result.push(ValidationIssue::new(
            IssueKind::DuplicateMapping,
            "Multiple source columns mapped to 'Email' (Email)",
        ));
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.warning_count(), 1);
        assert!(result.has_errors());
        assert!(!result.is_valid());
        assert_eq!(result.all_issues()[0].kind, IssueKind::MissingRequired);
    }

    #[test]
    fn configuration_serializes() {
        let mut config = MappingConfiguration::new("Accounts", "Account");
        config.add_mapping(FieldMapping::new("Company", "Name").required(true));
        let json = serde_json::to_string(&config).expect("serialize configuration");
        let round: MappingConfiguration =
            serde_json::from_str(&json).expect("deserialize configuration");
        assert_eq!(round.id, config.id);
        assert_eq!(round.mappings.len(), 1);
    }
}
