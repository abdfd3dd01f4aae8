//! Mapping types: transient candidates, field mappings and saved configurations.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Format version written into saved configurations.
pub const CONFIGURATION_VERSION: &str = "1.0";

/// Only supported mapping type.
pub const DIRECT_MAPPING: &str = "direct";

/// Source-signature policy recorded with saved configurations.
pub const WARN_ON_MISMATCH: &str = "warn_on_mismatch";

/// Strategy that produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMethod {
    Fuzzy,
    Semantic,
    Llm,
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethod::Fuzzy => "fuzzy",
            MatchMethod::Semantic => "semantic",
            MatchMethod::Llm => "llm",
        }
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fuzzy" => Ok(MatchMethod::Fuzzy),
            "semantic" => Ok(MatchMethod::Semantic),
            "llm" => Ok(MatchMethod::Llm),
            _ => Err(format!("Unknown match method: {s}")),
        }
    }
}

/// A scored proposal linking one column to one field. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingCandidate {
    pub source_column: String,
    pub target_field: String,
    pub score: f64,
    pub method: MatchMethod,
    pub reasoning: Option<String>,
}

impl MappingCandidate {
    pub fn new(
        source_column: impl Into<String>,
        target_field: impl Into<String>,
        score: f64,
        method: MatchMethod,
    ) -> Self {
        Self {
            source_column: source_column.into(),
            target_field: target_field.into(),
            score,
            method,
            reasoning: None,
        }
    }

    pub fn with_reasoning(mut self, reasoning: Option<String>) -> Self {
        self.reasoning = reasoning;
        self
    }
}

fn default_mapping_type() -> String {
    DIRECT_MAPPING.to_string()
}

fn default_version() -> String {
    CONFIGURATION_VERSION.to_string()
}

/// Column-to-field mapping.
///
/// `confidence` and `method` are session-only and are dropped on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub source_column: String,
    pub target_field: String,
    #[serde(default = "default_mapping_type")]
    pub mapping_type: String,
    #[serde(default)]
    pub transform_expr: Option<String>,
    #[serde(default)]
    pub is_required: bool,
    #[serde(skip)]
    pub confidence: Option<f64>,
    #[serde(skip)]
    pub method: Option<MatchMethod>,
}

impl FieldMapping {
    pub fn new(source_column: impl Into<String>, target_field: impl Into<String>) -> Self {
        Self {
            source_column: source_column.into(),
            target_field: target_field.into(),
            mapping_type: default_mapping_type(),
            transform_expr: None,
            is_required: false,
            confidence: None,
            method: None,
        }
    }

    pub fn required(mut self, is_required: bool) -> Self {
        self.is_required = is_required;
        self
    }

    pub fn with_match(mut self, confidence: f64, method: MatchMethod) -> Self {
        self.confidence = Some(confidence);
        self.method = Some(method);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFileSignature {
    pub expected_columns: Vec<String>,
    pub validation_mode: String,
}

/// A saved set of mappings for one target object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingConfiguration {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub salesforce_object: String,
    #[serde(default = "default_version")]
    pub version: String,
    pub created_date: NaiveDateTime,
    pub modified_date: NaiveDateTime,
    #[serde(default)]
    pub source_file_signature: Option<SourceFileSignature>,
    #[serde(default)]
    pub mappings: Vec<FieldMapping>,
}

impl MappingConfiguration {
    /// Start a new configuration with a fresh identifier.
    pub fn new(name: impl Into<String>, salesforce_object: impl Into<String>) -> Self {
        let now = Local::now().naive_local();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            salesforce_object: salesforce_object.into(),
            version: default_version(),
            created_date: now,
            modified_date: now,
            source_file_signature: None,
            mappings: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    fn touch(&mut self) {
        self.modified_date = Local::now().naive_local();
    }

    /// Add a mapping, replacing any existing mapping to the same target field.
    pub fn add_mapping(&mut self, mapping: FieldMapping) {
        self.mappings
            .retain(|existing| existing.target_field != mapping.target_field);
        self.mappings.push(mapping);
        self.touch();
    }

    /// Remove the mapping for a target field. Returns whether one existed.
    pub fn remove_mapping(&mut self, target_field: &str) -> bool {
        let before = self.mappings.len();
        self.mappings
            .retain(|existing| existing.target_field != target_field);
        let removed = self.mappings.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    pub fn mapping_for_field(&self, target_field: &str) -> Option<&FieldMapping> {
        self.mappings
            .iter()
            .find(|mapping| mapping.target_field == target_field)
    }

    pub fn mapped_source_columns(&self) -> BTreeSet<&str> {
        self.mappings
            .iter()
            .map(|mapping| mapping.source_column.as_str())
            .collect()
    }

    pub fn mapped_target_fields(&self) -> BTreeSet<&str> {
        self.mappings
            .iter()
            .map(|mapping| mapping.target_field.as_str())
            .collect()
    }

    /// Record the columns of the file this configuration was built from.
    pub fn set_source_columns(&mut self, columns: &[String]) {
        self.source_file_signature = Some(SourceFileSignature {
            expected_columns: columns.to_vec(),
            validation_mode: WARN_ON_MISMATCH.to_string(),
        });
    }

    /// Expected columns absent from `columns`. Empty when no signature is recorded.
    pub fn check_source_columns(&self, columns: &[String]) -> Vec<String> {
        let Some(signature) = &self.source_file_signature else {
            return Vec::new();
        };
        let present: BTreeSet<&str> = columns.iter().map(String::as_str).collect();
        signature
            .expected_columns
            .iter()
            .filter(|column| !present.contains(column.as_str()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_mapping_replaces_same_target() {
        let mut config = MappingConfiguration::new("Claims", "Claim__c");
        config.add_mapping(FieldMapping::new("Claim Name", "Name"));
        config.add_mapping(FieldMapping::new("Status", "Status__c"));
        config.add_mapping(FieldMapping::new("Title", "Name"));

        assert_eq!(config.mappings.len(), 2);
        assert_eq!(config.mapping_for_field("Name").unwrap().source_column, "Title");
        assert!(config.modified_date >= config.created_date);
    }

    #[test]
    fn remove_mapping_reports_presence() {
        let mut config = MappingConfiguration::new("Claims", "Claim__c");
        config.add_mapping(FieldMapping::new("Status", "Status__c"));
        assert!(config.remove_mapping("Status__c"));
        assert!(!config.remove_mapping("Status__c"));
        assert!(config.mappings.is_empty());
    }

    #[test]
    fn signature_reports_missing_columns() {
        let mut config = MappingConfiguration::new("Claims", "Claim__c");
        assert!(config.check_source_columns(&[]).is_empty());
        config.set_source_columns(&["A".to_string(), "B".to_string()]);
        let missing = config.check_source_columns(&["B".to_string(), "C".to_string()]);
        assert_eq!(missing, vec!["A".to_string()]);
        assert_eq!(
            config.source_file_signature.unwrap().validation_mode,
            "warn_on_mismatch"
        );
    }

    #[test]
    fn ids_are_unique() {
        let a = MappingConfiguration::new("a", "Account");
        let b = MappingConfiguration::new("a", "Account");
        assert_ne!(a.id, b.id);
    }
}
