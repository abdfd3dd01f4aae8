//! Error types for source file ingestion.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while importing source files or writing templates.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    /// Source file not found.
    #[error("CSV file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Failed to read file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Only `.csv` sources are supported.
    #[error("unsupported file extension '{extension}': {path}")]
    UnsupportedExtension { path: PathBuf, extension: String },

    // === CSV Parsing Errors ===
    /// Failed to parse CSV content.
    #[error("failed to parse CSV {path}: {source}")]
    CsvParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The first row is missing or blank.
    #[error("CSV file has no headers: {path}")]
    NoHeaders { path: PathBuf },

    // === Template Errors ===
    /// No field of the object qualifies for a template.
    #[error("No createable fields found for {object}")]
    NoTemplateFields { object: String },

    /// Failed to write a template file.
    #[error("failed to write template {path}: {source}")]
    TemplateWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl IngestError {
    pub(crate) fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::FileRead {
                path: path.to_path_buf(),
                source: err,
            }
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IngestError::FileNotFound {
            path: PathBuf::from("/path/to/file.csv"),
        };
        assert_eq!(err.to_string(), "CSV file not found: /path/to/file.csv");

        let err = IngestError::NoTemplateFields {
            object: "Claim__c".to_string(),
        };
        assert_eq!(err.to_string(), "No createable fields found for Claim__c");
    }

    #[test]
    fn test_missing_file_maps_to_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = IngestError::io(std::path::Path::new("a.csv"), io);
        assert!(matches!(err, IngestError::FileNotFound { .. }));

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = IngestError::io(std::path::Path::new("a.csv"), io);
        assert!(matches!(err, IngestError::FileRead { .. }));
    }
}
