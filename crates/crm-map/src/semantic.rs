//! Embedding-based semantic matching.
//!
//! The embedding model is loaded lazily on first use. A failed load moves the
//! matcher into [`EmbedderState::Unavailable`] for the rest of its life; the
//! resolver checks [`EmbeddingMatcher::is_available`] instead of retrying.

use std::fmt;

use crm_model::{MappingCandidate, MatchMethod, SourceColumn, TargetObject};
use tracing::{debug, info, warn};

use crate::error::EmbeddingError;
use crate::resolver::ColumnScorer;

/// Best fuzzy score at or above which the semantic stage is skipped.
pub const SEMANTIC_TRIGGER: f64 = 0.85;

/// Sentence-embedding backend.
pub trait Embedder: Send {
    fn model_name(&self) -> &str;

    /// Encode each text into a dense vector.
    fn embed(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Factory invoked once, on first use.
pub type EmbedderLoader = Box<dyn FnOnce() -> Result<Box<dyn Embedder>, EmbeddingError> + Send>;

pub enum EmbedderState {
    NotLoaded(EmbedderLoader),
    Ready(Box<dyn Embedder>),
    Unavailable(String),
}

impl fmt::Debug for EmbedderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotLoaded(_) => f.write_str("NotLoaded"),
            Self::Ready(embedder) => write!(f, "Ready({})", embedder.model_name()),
            Self::Unavailable(reason) => write!(f, "Unavailable({reason})"),
        }
    }
}

/// Cosine similarity of two vectors. Mismatched or empty inputs score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 { 0.0 } else { dot / denom }
}

#[derive(Debug)]
pub struct EmbeddingMatcher {
    state: EmbedderState,
    threshold: f64,
    /// Field vectors for the object scored last, keyed by the embedded field texts.
    field_cache: Option<(Vec<String>, Vec<Vec<f32>>)>,
}

impl EmbeddingMatcher {
    pub fn new(loader: EmbedderLoader, threshold: f64) -> Self {
        Self {
            state: EmbedderState::NotLoaded(loader),
            threshold,
            field_cache: None,
        }
    }

    /// A matcher that never runs.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: EmbedderState::Unavailable(reason.into()),
            threshold: 1.0,
            field_cache: None,
        }
    }

    /// Matcher backed by the bundled local model when compiled in.
    pub fn with_default_model(threshold: f64) -> Self {
        Self::new(Box::new(default_embedder), threshold)
    }

    pub fn state(&self) -> &EmbedderState {
        &self.state
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.state, EmbedderState::Unavailable(_))
    }

    /// Load the model if needed. Returns whether the stage can run.
    pub fn ensure_loaded(&mut self) -> bool {
        let state = std::mem::replace(&mut self.state, EmbedderState::Unavailable(String::new()));
        self.state = match state {
            EmbedderState::NotLoaded(loader) => {
                info!("Loading semantic embedding model");
                match loader() {
                    Ok(embedder) => {
                        info!(model = embedder.model_name(), "Semantic embedding model loaded");
                        EmbedderState::Ready(embedder)
                    }
                    Err(error) => {
                        warn!(%error, "Semantic matching disabled");
                        EmbedderState::Unavailable(error.to_string())
                    }
                }
            }
            other => other,
        };
        self.is_available()
    }

    fn field_vectors(
        &mut self,
        object: &TargetObject,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let texts: Vec<String> = object
            .fields
            .iter()
            .map(|field| format!("{} {}", field.name, field.label))
            .collect();
        if let Some((cached, vectors)) = &self.field_cache {
            if cached == &texts {
                return Ok(vectors.clone());
            }
        }
        let EmbedderState::Ready(embedder) = &mut self.state else {
            return Err(EmbeddingError::Unavailable("model not loaded".to_string()));
        };
        let vectors = embedder.embed(&texts)?;
        if vectors.len() != texts.len() {
            return Err(EmbeddingError::Encode(format!(
                "expected {} vectors, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        self.field_cache = Some((texts, vectors.clone()));
        Ok(vectors)
    }

    fn try_score(
        &mut self,
        column: &SourceColumn,
        object: &TargetObject,
    ) -> Result<Vec<MappingCandidate>, EmbeddingError> {
        let fields = self.field_vectors(object)?;
        let EmbedderState::Ready(embedder) = &mut self.state else {
            return Ok(Vec::new());
        };
        let column_vector = embedder
            .embed(std::slice::from_ref(&column.name))?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Encode("empty embedding response".to_string()))?;

        Ok(object
            .fields
            .iter()
            .zip(&fields)
            .filter_map(|(field, vector)| {
                let score = f64::from(cosine_similarity(&column_vector, vector)).clamp(0.0, 1.0);
                (score >= self.threshold).then(|| {
                    MappingCandidate::new(&column.name, &field.name, score, MatchMethod::Semantic)
                })
            })
            .collect())
    }
}

impl ColumnScorer for EmbeddingMatcher {
    fn method(&self) -> MatchMethod {
        MatchMethod::Semantic
    }

    fn prepare(&mut self) -> bool {
        self.ensure_loaded()
    }

    fn wants(&self, best_so_far: Option<f64>) -> bool {
        best_so_far.is_none_or(|best| best < SEMANTIC_TRIGGER)
    }

    fn score_column(&mut self, column: &SourceColumn, object: &TargetObject) -> Vec<MappingCandidate> {
        match self.try_score(column, object) {
            Ok(candidates) => {
                debug!(column = %column.name, count = candidates.len(), "Semantic candidates");
                candidates
            }
            Err(error) => {
                warn!(column = %column.name, %error, "Semantic matching failed for column");
                Vec::new()
            }
        }
    }
}

#[cfg(feature = "local-embeddings")]
struct FastEmbedder {
    model: fastembed::TextEmbedding,
}

#[cfg(feature = "local-embeddings")]
impl Embedder for FastEmbedder {
    fn model_name(&self) -> &str {
        "all-MiniLM-L6-v2"
    }

    fn embed(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::Encode(e.to_string()))
    }
}

#[cfg(feature = "local-embeddings")]
fn default_embedder() -> Result<Box<dyn Embedder>, EmbeddingError> {
    let model = fastembed::TextEmbedding::try_new(fastembed::InitOptions::new(
        fastembed::EmbeddingModel::AllMiniLML6V2,
    ))
    .map_err(|e| EmbeddingError::Unavailable(e.to_string()))?;
    Ok(Box::new(FastEmbedder { model }))
}

#[cfg(not(feature = "local-embeddings"))]
fn default_embedder() -> Result<Box<dyn Embedder>, EmbeddingError> {
    Err(EmbeddingError::Unavailable(
        "built without the local-embeddings feature".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_model::{FieldType, TargetField};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Bag-of-letters vectors: enough to make "telephone" close to "Phone".
    struct LetterEmbedder {
        calls: Arc<AtomicUsize>,
    }

    impl Embedder for LetterEmbedder {
        fn model_name(&self) -> &str {
            "letters"
        }

        fn embed(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|text| {
                    let mut v = vec![0.0f32; 26];
                    for c in text.to_lowercase().chars().filter(char::is_ascii_lowercase) {
                        v[(c as u8 - b'a') as usize] += 1.0;
                    }
                    v
                })
                .collect())
        }
    }

    fn object() -> TargetObject {
        TargetObject::new(
            "Contact",
            "Contact",
            vec![
                TargetField::new("Phone", "Business Phone", FieldType::Phone),
                TargetField::new("Birthdate", "Birthdate", FieldType::Date),
            ],
        )
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.3, 0.4, 0.5];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn failed_load_disables_matcher() {
        let mut matcher = EmbeddingMatcher::new(
            Box::new(|| Err(EmbeddingError::Unavailable("no model".to_string()))),
            0.5,
        );
        assert!(matcher.is_available());
        assert!(!matcher.prepare());
        assert!(!matcher.is_available());
        assert!(matches!(matcher.state(), EmbedderState::Unavailable(reason) if reason.contains("no model")));
        assert!(!matcher.prepare());
    }

    #[test]
    fn field_vectors_are_cached_per_object() {
        let calls = Arc::new(AtomicUsize::new(0));
        let shared = Arc::clone(&calls);
        let mut matcher = EmbeddingMatcher::new(
            Box::new(move || Ok(Box::new(LetterEmbedder { calls: shared }) as Box<dyn Embedder>)),
            0.5,
        );
        assert!(matcher.prepare());
        let object = object();
        let first = matcher.score_column(&SourceColumn::new("Business Telephone", 0), &object);
        assert!(first.iter().any(|c| c.target_field == "Phone"));
        assert!(first.iter().all(|c| c.method == MatchMethod::Semantic));
        matcher.score_column(&SourceColumn::new("Birth Day", 1), &object);
        // One call for the fields, one per column.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn changed_fields_under_the_same_name_are_re_embedded() {
        let calls = Arc::new(AtomicUsize::new(0));
        let shared = Arc::clone(&calls);
        let mut matcher = EmbeddingMatcher::new(
            Box::new(move || Ok(Box::new(LetterEmbedder { calls: shared }) as Box<dyn Embedder>)),
            0.5,
        );
        assert!(matcher.prepare());
        let column = SourceColumn::new("Birthdate", 0);
        matcher.score_column(&column, &object());

        let refetched = TargetObject::new(
            "Contact",
            "Contact",
            vec![TargetField::new("Birthdate", "Birthdate", FieldType::Date)],
        );
        let candidates = matcher.score_column(&column, &refetched);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        let birthdate = candidates
            .iter()
            .find(|c| c.target_field == "Birthdate")
            .expect("birthdate candidate");
        assert!((birthdate.score - 1.0).abs() < 1e-6);
        assert!(candidates.iter().all(|c| c.target_field != "Phone"));
    }

    #[test]
    fn only_ambiguous_columns_are_wanted() {
        let matcher = EmbeddingMatcher::unavailable("off");
        assert!(matcher.wants(None));
        assert!(matcher.wants(Some(0.84)));
        assert!(!matcher.wants(Some(0.85)));
    }
}
