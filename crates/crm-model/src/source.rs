//! Source file snapshots produced by the importer.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Primitive type inferred from a column's sample values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferredType {
    #[default]
    String,
    Number,
    Date,
    Boolean,
}

impl InferredType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InferredType::String => "string",
            InferredType::Number => "number",
            InferredType::Date => "date",
            InferredType::Boolean => "boolean",
        }
    }
}

impl fmt::Display for InferredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceColumn {
    pub name: String,
    /// Zero-based position in the file header.
    pub index: usize,
    pub inferred_type: InferredType,
    /// First sampled cells in file order, blanks included.
    pub sample_values: Vec<String>,
    /// Empty cells seen in the sampled rows.
    pub null_count: usize,
}

impl SourceColumn {
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
            inferred_type: InferredType::String,
            sample_values: Vec::new(),
            null_count: 0,
        }
    }

    pub fn with_type(mut self, inferred_type: InferredType) -> Self {
        self.inferred_type = inferred_type;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDataset {
    pub path: PathBuf,
    pub columns: Vec<SourceColumn>,
    pub total_rows: usize,
    /// Label of the text encoding the file was decoded with.
    pub encoding: String,
}

impl SourceDataset {
    /// Build an in-memory dataset from column names only.
    pub fn from_column_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = names
            .into_iter()
            .enumerate()
            .map(|(index, name)| SourceColumn::new(name, index))
            .collect();
        Self {
            path: PathBuf::new(),
            columns,
            total_rows: 0,
            encoding: "utf-8".to_string(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&SourceColumn> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }
}

/// One source row keyed by column name.
pub type SourceRecord = BTreeMap<String, String>;
