//! Error types for load execution.

use thiserror::Error;

/// Errors raised by the API collaborators and the load executor.
///
/// Per-row failures never surface here; they are recorded in the
/// [`LoadResult`](crm_model::LoadResult). This type covers calls that
/// failed as a whole.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    /// The access token was rejected.
    #[error("session expired")]
    SessionExpired,

    /// No connection has been established.
    #[error("Not connected to Salesforce")]
    NotConnected,

    /// Network request failed.
    #[error("network error: {0}")]
    Network(String),

    /// The API answered with an error status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Describe of an unknown object.
    #[error("Object '{0}' not found in Salesforce")]
    ObjectNotFound(String),

    /// A response body could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// CSV encoding or decoding of bulk data failed.
    #[error("CSV error: {0}")]
    Csv(String),

    /// A bulk upload had no records.
    #[error("No data to upload")]
    EmptyUpload,

    /// Bulk job did not finish in time.
    #[error("Bulk job {job_id} timeout after {seconds} seconds")]
    Timeout { job_id: String, seconds: u64 },

    /// The caller cancelled the run.
    #[error("load cancelled")]
    Cancelled,
}

impl LoadError {
    /// Returns a user-friendly error message suitable for display.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::SessionExpired => "Your session has expired. Please log in again.",
            Self::NotConnected => "Not connected. Please log in first.",
            Self::Network(_) => "Could not reach the server. Please check your connection.",
            Self::Api { .. } => "The server rejected the request.",
            Self::ObjectNotFound(_) => "The selected object does not exist in this org.",
            Self::Timeout { .. } => "The bulk job took too long to finish.",
            Self::EmptyUpload => "There are no records to load.",
            Self::Cancelled => "The load was cancelled.",
            Self::InvalidResponse(_) | Self::Csv(_) => "An unexpected error occurred.",
        }
    }

    /// Returns whether this error is potentially recoverable with a retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout { .. } | Self::SessionExpired => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }
}

impl From<reqwest::Error> for LoadError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

impl From<csv::Error> for LoadError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err.to_string())
    }
}

impl From<crm_model::ModelError> for LoadError {
    fn from(err: crm_model::ModelError) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

/// Result type alias for load operations.
pub type Result<T> = std::result::Result<T, LoadError>;
