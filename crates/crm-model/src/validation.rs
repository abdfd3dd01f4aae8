use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// Kind of mapping problem found by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingRequired,
    DuplicateMapping,
    InvalidField,
    NonUpdateable,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::MissingRequired => "missing_required",
            IssueKind::DuplicateMapping => "duplicate_mapping",
            IssueKind::InvalidField => "invalid_field",
            IssueKind::NonUpdateable => "non_updateable",
        }
    }

    /// Severity attached to this kind of issue.
    pub fn severity(&self) -> IssueSeverity {
        match self {
            IssueKind::MissingRequired | IssueKind::InvalidField => IssueSeverity::Error,
            IssueKind::DuplicateMapping | IssueKind::NonUpdateable => IssueSeverity::Warning,
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub severity: IssueSeverity,
    /// Human-readable message.
    pub message: String,
    /// Target field involved, when there is one.
    pub field_name: Option<String>,
    /// Source column involved, when there is one.
    pub source_column: Option<String>,
}

impl ValidationIssue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            message: message.into(),
            field_name: None,
            source_column: None,
        }
    }

    pub fn for_field(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = Some(field_name.into());
        self
    }

    pub fn for_column(mut self, source_column: impl Into<String>) -> Self {
        self.source_column = Some(source_column.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == IssueSeverity::Error
    }
}

/// Outcome of validating a mapping set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Valid when no blocking error was found. Warnings never block.
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    pub fn errors(&self) -> Vec<&ValidationIssue> {
        self.issues.iter().filter(|issue| issue.is_error()).collect()
    }

    pub fn warnings(&self) -> Vec<&ValidationIssue> {
        self.issues.iter().filter(|issue| !issue.is_error()).collect()
    }

    /// Errors first, then warnings.
    pub fn all_issues(&self) -> Vec<&ValidationIssue> {
        let mut all = self.errors();
        all.extend(self.warnings());
        all
    }

    pub fn error_count(&self) -> usize {
        self.issues.iter().filter(|issue| issue.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues.len() - self.error_count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn has_warnings(&self) -> bool {
        self.warning_count() > 0
    }

    pub fn count_of(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|issue| issue.kind == kind).count()
    }
}
