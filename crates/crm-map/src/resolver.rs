//! Layered column-to-field resolution.
//!
//! Stages run in a fixed order: fuzzy name matching for every column, then
//! embeddings for columns still below [`SEMANTIC_TRIGGER`], then the LLM for
//! columns still below [`LLM_TRIGGER`]. Candidates from all stages are pooled
//! per column and the best one above the threshold becomes the mapping.
//!
//! [`SEMANTIC_TRIGGER`]: crate::semantic::SEMANTIC_TRIGGER
//! [`LLM_TRIGGER`]: crate::llm::LLM_TRIGGER

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crm_model::{
    FieldMapping, MappingCandidate, MatchMethod, SourceColumn, SourceDataset, TargetObject,
};
use tracing::{debug, info, info_span, warn};

use crate::config::{ResolverConfig, fuzzy_threshold};
use crate::error::MappingError;
use crate::fuzzy::FuzzyScorer;
use crate::llm::{LlmClient, LlmMatcher, build_client};
use crate::semantic::{EmbedderLoader, EmbeddingMatcher};

/// One matching stage of the resolver.
pub trait ColumnScorer {
    fn method(&self) -> MatchMethod;

    /// Called once per run before scoring. `false` skips the stage.
    fn prepare(&mut self) -> bool {
        true
    }

    /// Whether a column whose best score so far is `best_so_far` should be
    /// scored by this stage.
    fn wants(&self, best_so_far: Option<f64>) -> bool;

    fn score_column(&mut self, column: &SourceColumn, object: &TargetObject) -> Vec<MappingCandidate>;

    fn score_batch(&mut self, columns: &[&SourceColumn], object: &TargetObject) -> Vec<MappingCandidate> {
        columns
            .iter()
            .flat_map(|column| self.score_column(column, object))
            .collect()
    }
}

/// Outcome of a resolver run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// At most one mapping per source column, in column order.
    pub mappings: Vec<FieldMapping>,
    /// Columns that received no mapping.
    pub unmapped_columns: Vec<String>,
    /// Mappings produced per stage.
    pub method_counts: BTreeMap<MatchMethod, usize>,
}

impl Resolution {
    pub fn count(&self, method: MatchMethod) -> usize {
        self.method_counts.get(&method).copied().unwrap_or(0)
    }

    pub fn mapping_for_column(&self, column: &str) -> Option<&FieldMapping> {
        self.mappings.iter().find(|m| m.source_column == column)
    }
}

#[derive(Debug)]
pub struct MappingResolver {
    threshold: f64,
    fuzzy: FuzzyScorer,
    semantic: Option<EmbeddingMatcher>,
    llm: Option<LlmMatcher>,
}

impl MappingResolver {
    /// Build the stages `config` enables.
    ///
    /// The semantic stage uses the bundled model. A configured LLM whose
    /// client cannot be built is left out with a warning.
    pub fn new(config: &ResolverConfig) -> Self {
        let semantic = config
            .use_semantic
            .then(|| EmbeddingMatcher::with_default_model(config.threshold));

        let llm = if config.llm_ready() {
            let key = config.llm_api_key.as_deref().unwrap_or_default();
            match build_client(
                config.llm_provider,
                key,
                config.llm_model.as_deref(),
                config.llm_base_url.as_deref(),
            ) {
                Ok(client) => Some(
                    LlmMatcher::new(client, config.threshold).with_batch_size(config.llm_batch_size),
                ),
                Err(error) => {
                    warn!(%error, provider = %config.llm_provider, "LLM matching disabled");
                    None
                }
            }
        } else {
            if config.use_llm {
                info!("LLM matching enabled but no API key configured");
            }
            None
        };

        Self {
            threshold: config.threshold,
            fuzzy: FuzzyScorer::new(config.threshold),
            semantic,
            llm,
        }
    }

    /// Replace the embedding backend.
    pub fn with_embedder_loader(mut self, loader: EmbedderLoader) -> Self {
        self.semantic = Some(EmbeddingMatcher::new(loader, self.threshold));
        self
    }

    /// Replace the completion backend and enable the LLM stage.
    pub fn with_llm_client(mut self, client: Box<dyn LlmClient>, batch_size: usize) -> Self {
        self.llm = Some(LlmMatcher::new(client, self.threshold).with_batch_size(batch_size));
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn semantic_available(&self) -> bool {
        self.semantic.as_ref().is_some_and(EmbeddingMatcher::is_available)
    }

    pub fn llm_enabled(&self) -> bool {
        self.llm.is_some()
    }

    /// Propose mappings for every column of `dataset`.
    pub fn resolve(&mut self, dataset: &SourceDataset, object: &TargetObject) -> Resolution {
        let _span = info_span!(
            "resolve_mappings",
            object = %object.name,
            columns = dataset.columns.len()
        )
        .entered();

        let mut index: HashMap<&str, usize> = HashMap::new();
        for (i, column) in dataset.columns.iter().enumerate() {
            index.entry(column.name.as_str()).or_insert(i);
        }
        let mut pools: Vec<Vec<MappingCandidate>> = vec![Vec::new(); dataset.columns.len()];

        let optional: [Option<&mut dyn ColumnScorer>; 2] = [
            self.semantic.as_mut().map(|s| s as &mut dyn ColumnScorer),
            self.llm.as_mut().map(|l| l as &mut dyn ColumnScorer),
        ];
        let mut later: Vec<&mut dyn ColumnScorer> = Vec::new();
        for stage in optional.into_iter().flatten() {
            if stage.prepare() {
                later.push(stage);
            } else {
                debug!(method = %stage.method(), "Stage unavailable, skipping");
            }
        }

        // Raised only when a later stage will run this time.
        let stage_threshold = fuzzy_threshold(self.threshold, !later.is_empty());
        self.fuzzy = FuzzyScorer::new(stage_threshold);
        debug!(fuzzy_threshold = stage_threshold, "Fuzzy stage threshold");

        let mut stages: Vec<&mut dyn ColumnScorer> = vec![&mut self.fuzzy];
        stages.extend(later);

        for stage in stages {
            let method = stage.method();
            let wanted: Vec<&SourceColumn> = dataset
                .columns
                .iter()
                .zip(&pools)
                .filter(|(_, pool)| stage.wants(best_score(pool)))
                .map(|(column, _)| column)
                .collect();
            if wanted.is_empty() {
                continue;
            }
            debug!(%method, columns = wanted.len(), "Running stage");
            for candidate in stage.score_batch(&wanted, object) {
                if let Some(&i) = index.get(candidate.source_column.as_str()) {
                    pools[i].push(candidate);
                }
            }
        }

        let mut resolution = Resolution::default();
        for (column, mut pool) in dataset.columns.iter().zip(pools) {
            // Stable: on equal scores the earlier stage stays first.
            pool.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
            let best = pool
                .into_iter()
                .next()
                .filter(|candidate| candidate.score >= self.threshold);
            match best {
                Some(candidate) => {
                    let required = object
                        .field(&candidate.target_field)
                        .is_some_and(|field| field.required);
                    *resolution.method_counts.entry(candidate.method).or_default() += 1;
                    resolution.mappings.push(
                        FieldMapping::new(&column.name, &candidate.target_field)
                            .required(required)
                            .with_match(candidate.score, candidate.method),
                    );
                }
                None => resolution.unmapped_columns.push(column.name.clone()),
            }
        }

        info!(
            mapped = resolution.mappings.len(),
            unmapped = resolution.unmapped_columns.len(),
            fuzzy = resolution.count(MatchMethod::Fuzzy),
            semantic = resolution.count(MatchMethod::Semantic),
            llm = resolution.count(MatchMethod::Llm),
            "Mapping resolution complete"
        );
        resolution
    }
}

fn best_score(pool: &[MappingCandidate]) -> Option<f64> {
    pool.iter().map(|c| c.score).reduce(f64::max)
}

/// Resolve mappings with a fresh resolver built from `config`.
pub fn resolve_mappings(
    dataset: &SourceDataset,
    object: &TargetObject,
    config: &ResolverConfig,
) -> Resolution {
    MappingResolver::new(config).resolve(dataset, object)
}

/// Point `column` at `field` by hand, replacing whatever the column had.
pub fn apply_override(
    mappings: &mut Vec<FieldMapping>,
    dataset: &SourceDataset,
    object: &TargetObject,
    column: &str,
    field: &str,
) -> Result<(), MappingError> {
    if dataset.column(column).is_none() {
        return Err(MappingError::ColumnNotFound(column.to_string()));
    }
    let target = object
        .field(field)
        .ok_or_else(|| MappingError::FieldNotFound(field.to_string()))?;
    mappings.retain(|m| m.source_column != column);
    mappings.push(FieldMapping::new(column, &target.name).required(target.required));
    Ok(())
}

/// Drop the mapping for `column`. Returns whether one existed.
pub fn clear_mapping(mappings: &mut Vec<FieldMapping>, column: &str) -> bool {
    let before = mappings.len();
    mappings.retain(|m| m.source_column != column);
    mappings.len() != before
}
