//! Collaborator traits for the remote org.
//!
//! [`RestConnection`](crate::rest::RestConnection) implements all of them
//! over HTTP. Tests substitute in-memory fakes.

use std::fmt;

use crm_model::{LoadOperation, TargetRecord};
use serde::Deserialize;

use crate::error::Result;

/// Schema discovery calls.
pub trait MetadataApi {
    /// Raw `describeGlobal` payload.
    fn describe_global(&self) -> Result<serde_json::Value>;

    /// Raw describe payload for one object.
    fn describe_object(&self, object: &str) -> Result<serde_json::Value>;

    /// Raw payload of a SOQL query (`{"totalSize", "records": [...]}`).
    fn query(&self, soql: &str) -> Result<serde_json::Value>;

    /// Same as [`query`](Self::query) against the Tooling API.
    fn tooling_query(&self, soql: &str) -> Result<serde_json::Value>;
}

/// Single-record writes.
pub trait RecordApi {
    fn create(&self, object: &str, record: &TargetRecord) -> Result<SaveResult>;

    fn update(&self, object: &str, id: &str, record: &TargetRecord) -> Result<()>;
}

/// Bulk API 2.0 ingest jobs.
pub trait BulkApi {
    /// Open a job and return its id.
    fn create_job(&self, object: &str, operation: LoadOperation) -> Result<String>;

    fn upload_batch(&self, job_id: &str, csv: &str) -> Result<()>;

    /// Mark the upload complete so the job starts processing.
    fn close_job(&self, job_id: &str) -> Result<()>;

    fn job_status(&self, job_id: &str) -> Result<JobInfo>;

    /// Result rows as CSV text. Empty when the server has none.
    fn fetch_results(&self, job_id: &str, kind: ResultKind) -> Result<String>;

    fn abort_job(&self, job_id: &str) -> Result<()>;
}

/// Session lifecycle.
pub trait Connection {
    /// Obtain a fresh session after the current one expired.
    fn reconnect(&mut self) -> Result<()>;
}

/// Everything the executor needs from an org.
pub trait CrmApi: MetadataApi + RecordApi + BulkApi + Connection {}

impl<T: MetadataApi + RecordApi + BulkApi + Connection> CrmApi for T {}

/// Outcome of a single create call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SaveResult {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
}

impl SaveResult {
    pub fn created(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            success: true,
            errors: Vec::new(),
        }
    }

    pub fn rejected(messages: &[&str]) -> Self {
        Self {
            id: None,
            success: false,
            errors: messages
                .iter()
                .map(|message| ApiMessage {
                    message: Some((*message).to_string()),
                    ..ApiMessage::default()
                })
                .collect(),
        }
    }

    /// All error messages joined with `"; "`.
    pub fn error_text(&self) -> String {
        self.errors
            .iter()
            .map(|error| error.message.as_deref().unwrap_or("Unknown error"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// One error entry as returned by the REST API.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMessage {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, alias = "statusCode")]
    pub error_code: Option<String>,
    #[serde(default)]
    pub fields: Vec<String>,
}

/// Lifecycle state of a bulk ingest job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum BulkJobState {
    Open,
    UploadComplete,
    InProgress,
    JobComplete,
    Failed,
    Aborted,
    #[serde(other)]
    Unknown,
}

impl BulkJobState {
    /// The job will not change state any more.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::JobComplete | Self::Failed | Self::Aborted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::UploadComplete => "UploadComplete",
            Self::InProgress => "InProgress",
            Self::JobComplete => "JobComplete",
            Self::Failed => "Failed",
            Self::Aborted => "Aborted",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for BulkJobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job status as reported by the bulk API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobInfo {
    pub id: String,
    pub state: BulkJobState,
    #[serde(rename = "numberRecordsProcessed", default)]
    pub records_processed: u64,
    #[serde(rename = "numberRecordsFailed", default)]
    pub records_failed: u64,
    #[serde(rename = "errorMessage", default)]
    pub error_message: Option<String>,
}

impl JobInfo {
    pub fn new(id: impl Into<String>, state: BulkJobState) -> Self {
        Self {
            id: id.into(),
            state,
            records_processed: 0,
            records_failed: 0,
            error_message: None,
        }
    }
}

/// Which result set of a finished job to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Successful,
    Failed,
}

impl ResultKind {
    /// Path segment of the results endpoint.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Successful => "successfulResults",
            Self::Failed => "failedResults",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_info_parses_api_payload() {
        let info: JobInfo = serde_json::from_str(
            r#"{"id": "750R0000000zlh9IAA", "state": "JobComplete",
                "numberRecordsProcessed": 250, "numberRecordsFailed": 3, "object": "Account"}"#,
        )
        .expect("parse job info");
        assert_eq!(info.state, BulkJobState::JobComplete);
        assert!(info.state.is_terminal());
        assert_eq!(info.records_processed, 250);

        let info: JobInfo = serde_json::from_str(r#"{"id": "750", "state": "Queued"}"#)
            .expect("parse job info");
        assert_eq!(info.state, BulkJobState::Unknown);
        assert!(!info.state.is_terminal());
    }

    #[test]
    fn save_result_joins_errors() {
        let result: SaveResult = serde_json::from_str(
            r#"{"success": false, "errors": [
                {"message": "Required fields are missing: [Name]", "statusCode": "REQUIRED_FIELD_MISSING"},
                {"statusCode": "UNKNOWN"}
            ]}"#,
        )
        .expect("parse save result");
        assert_eq!(
            result.error_text(),
            "Required fields are missing: [Name]; Unknown error"
        );
        assert_eq!(SaveResult::created("001").error_text(), "");
    }
}
