//! Resolver configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::llm::{DEFAULT_BATCH_SIZE, LlmProvider};

/// Default minimum score for a proposed mapping.
pub const DEFAULT_THRESHOLD: f64 = 0.6;

/// Fuzzy stage threshold when a later stage can pick up weaker columns.
pub const LAYERED_FUZZY_THRESHOLD: f64 = 0.7;

/// Settings for one resolver run. Passed in explicitly; nothing is read from
/// the environment.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub threshold: f64,
    pub use_semantic: bool,
    pub use_llm: bool,
    pub llm_provider: LlmProvider,
    pub llm_model: Option<String>,
    #[serde(skip_serializing)]
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_batch_size: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            use_semantic: true,
            use_llm: false,
            llm_provider: LlmProvider::default(),
            llm_model: None,
            llm_api_key: None,
            llm_base_url: None,
            llm_batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl fmt::Debug for ResolverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverConfig")
            .field("threshold", &self.threshold)
            .field("use_semantic", &self.use_semantic)
            .field("use_llm", &self.use_llm)
            .field("llm_provider", &self.llm_provider)
            .field("llm_model", &self.llm_model)
            .field("llm_api_key", &self.llm_api_key.as_ref().map(|_| "<redacted>"))
            .field("llm_base_url", &self.llm_base_url)
            .field("llm_batch_size", &self.llm_batch_size)
            .finish()
    }
}

impl ResolverConfig {
    /// Name matching only.
    pub fn fuzzy_only(threshold: f64) -> Self {
        Self {
            threshold,
            use_semantic: false,
            use_llm: false,
            ..Self::default()
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_llm(mut self, provider: LlmProvider, api_key: impl Into<String>) -> Self {
        self.use_llm = true;
        self.llm_provider = provider;
        self.llm_api_key = Some(api_key.into());
        self
    }

    /// Threshold applied by the fuzzy stage. `layered` is whether a semantic
    /// or LLM stage will actually run after it.
    pub fn fuzzy_threshold(&self, layered: bool) -> f64 {
        fuzzy_threshold(self.threshold, layered)
    }

    /// LLM stage is enabled and has a key to call with.
    pub fn llm_ready(&self) -> bool {
        self.use_llm && self.llm_api_key.as_deref().is_some_and(|key| !key.trim().is_empty())
    }
}

pub(crate) fn fuzzy_threshold(threshold: f64, layered: bool) -> f64 {
    if layered {
        threshold.max(LAYERED_FUZZY_THRESHOLD)
    } else {
        threshold
    }
}
