//! Name-similarity stage.

use crm_model::{MappingCandidate, MatchMethod, SourceColumn, TargetObject};

use crate::resolver::ColumnScorer;
use crate::score::similarity;

/// Scores each column against every field's API name and label.
#[derive(Debug, Clone, Copy)]
pub struct FuzzyScorer {
    threshold: f64,
}

impl FuzzyScorer {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl ColumnScorer for FuzzyScorer {
    fn method(&self) -> MatchMethod {
        MatchMethod::Fuzzy
    }

    fn wants(&self, _best_so_far: Option<f64>) -> bool {
        true
    }

    fn score_column(&mut self, column: &SourceColumn, object: &TargetObject) -> Vec<MappingCandidate> {
        object
            .fields
            .iter()
            .filter_map(|field| {
                let score = similarity(&column.name, &field.name)
                    .max(similarity(&column.name, &field.label));
                (score >= self.threshold).then(|| {
                    MappingCandidate::new(&column.name, &field.name, score, MatchMethod::Fuzzy)
                })
            })
            .collect()
    }
}
