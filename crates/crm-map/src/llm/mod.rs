//! LLM-assisted matching for columns the cheaper stages left ambiguous.

mod client;
mod parse;
mod prompt;

use std::collections::BTreeSet;

use crm_model::{MappingCandidate, MatchMethod, SourceColumn, TargetObject};
use tracing::{info, warn};

pub use client::{
    ClaudeClient, DEFAULT_CLAUDE_MODEL, DEFAULT_OPENAI_MODEL, LlmProvider, OpenAiClient,
    build_client,
};
pub use parse::{LlmSuggestion, decode_suggestions, extract_json_array, parse_llm_response};
pub use prompt::{MAX_PROMPT_FIELDS, build_prompt};

use crate::error::LlmError;
use crate::resolver::ColumnScorer;

/// Best score at or above which a column is not sent to the model.
pub const LLM_TRIGGER: f64 = 0.75;

/// Columns per completion request.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// A text-completion backend.
pub trait LlmClient: Send {
    fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

impl<F> LlmClient for F
where
    F: Fn(&str) -> Result<String, LlmError> + Send,
{
    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self(prompt)
    }
}

pub struct LlmMatcher {
    client: Box<dyn LlmClient>,
    threshold: f64,
    batch_size: usize,
}

impl std::fmt::Debug for LlmMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmMatcher")
            .field("threshold", &self.threshold)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl LlmMatcher {
    pub fn new(client: Box<dyn LlmClient>, threshold: f64) -> Self {
        Self {
            client,
            threshold,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    fn match_batch(
        &self,
        batch: &[&SourceColumn],
        object: &TargetObject,
    ) -> Result<Vec<MappingCandidate>, LlmError> {
        let prompt = build_prompt(batch, object);
        let response = self.client.complete(&prompt)?;
        let names: BTreeSet<&str> = batch.iter().map(|column| column.name.as_str()).collect();
        Ok(parse_llm_response(&response, &names, object, self.threshold))
    }
}

impl ColumnScorer for LlmMatcher {
    fn method(&self) -> MatchMethod {
        MatchMethod::Llm
    }

    fn wants(&self, best_so_far: Option<f64>) -> bool {
        best_so_far.is_none_or(|best| best < LLM_TRIGGER)
    }

    fn score_column(&mut self, column: &SourceColumn, object: &TargetObject) -> Vec<MappingCandidate> {
        self.score_batch(&[column], object)
    }

    fn score_batch(&mut self, columns: &[&SourceColumn], object: &TargetObject) -> Vec<MappingCandidate> {
        let mut candidates = Vec::new();
        let total_batches = columns.len().div_ceil(self.batch_size);
        for (index, batch) in columns.chunks(self.batch_size).enumerate() {
            info!(
                batch = index + 1,
                total_batches,
                columns = batch.len(),
                "Sending columns to LLM"
            );
            match self.match_batch(batch, object) {
                Ok(found) => candidates.extend(found),
                Err(error) => warn!(batch = index + 1, %error, "LLM batch failed, skipping"),
            }
        }
        candidates
    }
}
