//! Load operations and result reports.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Write operation performed against the target object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadOperation {
    #[default]
    Insert,
    Update,
}

impl LoadOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadOperation::Insert => "insert",
            LoadOperation::Update => "update",
        }
    }
}

impl fmt::Display for LoadOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoadOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "insert" => Ok(LoadOperation::Insert),
            "update" => Ok(LoadOperation::Update),
            _ => Err(format!("Invalid operation: {s}")),
        }
    }
}

/// A converted, ready-to-write value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    Decimal(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Text(text) if text.trim().is_empty())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(value) => write!(f, "{value}"),
            FieldValue::Integer(value) => write!(f, "{value}"),
            FieldValue::Decimal(value) => write!(f, "{value}"),
            FieldValue::Text(value) => f.write_str(value),
        }
    }
}

/// A record keyed by target field name, ready to submit.
pub type TargetRecord = BTreeMap<String, FieldValue>;

/// One failed row in a load report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowError {
    /// One-based row number; 0 marks a job-level failure.
    pub row: usize,
    pub record: BTreeMap<String, String>,
    pub error: String,
}

impl RowError {
    pub fn for_record(row: usize, record: &TargetRecord, error: impl Into<String>) -> Self {
        Self {
            row,
            record: record
                .iter()
                .map(|(key, value)| (key.clone(), value.to_string()))
                .collect(),
            error: error.into(),
        }
    }
}

/// Report produced by every load run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadResult {
    pub total_rows: usize,
    pub successful_rows: usize,
    pub failed_rows: usize,
    pub errors: Vec<RowError>,
}

impl LoadResult {
    /// Fraction of rows written successfully, 0 when nothing was loaded.
    pub fn success_rate(&self) -> f64 {
        if self.total_rows == 0 {
            return 0.0;
        }
        self.successful_rows as f64 / self.total_rows as f64
    }

    /// Result for a run that failed as a whole.
    pub fn all_failed(total_rows: usize, error: impl Into<String>) -> Self {
        Self {
            total_rows,
            successful_rows: 0,
            failed_rows: total_rows,
            errors: vec![RowError {
                row: 0,
                record: BTreeMap::new(),
                error: error.into(),
            }],
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.successful_rows + self.failed_rows == self.total_rows
    }
}
