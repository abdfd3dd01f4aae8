//! Column-to-field mapping for CRM imports.
//!
//! Matching runs in layers, cheapest first:
//!
//! 1. **Fuzzy**: normalized name similarity against field names and labels
//! 2. **Semantic**: sentence embeddings for columns with no strong name match
//! 3. **LLM**: a completion model for whatever is still ambiguous
//!
//! [`resolve_mappings`] runs the enabled layers and keeps the best candidate
//! per column. [`MappingRepository`] stores the resulting configurations.

pub mod config;
pub mod error;
pub mod fuzzy;
pub mod llm;
pub mod repository;
pub mod resolver;
pub mod score;
pub mod semantic;

pub use config::{DEFAULT_THRESHOLD, ResolverConfig};
pub use error::{EmbeddingError, LlmError, MappingError};
pub use fuzzy::FuzzyScorer;
pub use llm::{LlmClient, LlmMatcher, LlmProvider, parse_llm_response};
pub use repository::{MappingRepository, load_from_path, save_to_path};
pub use resolver::{
    ColumnScorer, MappingResolver, Resolution, apply_override, clear_mapping, resolve_mappings,
};
pub use score::{matching_blocks_ratio, normalize_name, similarity};
pub use semantic::{Embedder, EmbedderLoader, EmbedderState, EmbeddingMatcher, cosine_similarity};
