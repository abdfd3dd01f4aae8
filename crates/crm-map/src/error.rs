//! Error types for mapping operations.

use std::fmt;

use thiserror::Error;

/// Errors from editing a mapping by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// Field not found on the target object.
    FieldNotFound(String),
    /// Column not found in the source dataset.
    ColumnNotFound(String),
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldNotFound(name) => write!(f, "Field not found: {name}"),
            Self::ColumnNotFound(name) => write!(f, "Column not found: {name}"),
        }
    }
}

impl std::error::Error for MappingError {}

/// Errors raised while talking to a language-model provider.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LlmError {
    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// Provider answered with a non-success status.
    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Provider answered but the envelope had no text content.
    #[error("empty completion from provider")]
    EmptyCompletion,

    /// Unknown provider name in configuration.
    #[error("unknown LLM provider: {0}")]
    UnknownProvider(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// Errors raised by an embedding backend.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The backend could not be initialised.
    #[error("embedding model unavailable: {0}")]
    Unavailable(String),

    /// Encoding failed for a batch of texts.
    #[error("embedding failed: {0}")]
    Encode(String),
}
