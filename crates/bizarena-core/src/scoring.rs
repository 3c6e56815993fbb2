//! Scoring model: weighted aggregation of per-metric scores.
//!
//! One rule covers both per-criterion weights from the criteria parser and
//! the fixed per-category leaderboard tables:
//!
//! `score = Σ(raw[m] · w[m]) / Σ(w[m])` over the metrics `m` present in the
//! evaluation that have a weight. Metrics absent from the evaluation are
//! excluded from both sums, never counted as zero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{AgentCategory, Criterion, ScoringError};

/// Weights keyed by metric name, with an optional fallback weight.
///
/// With `default_weight == None`, metrics that have no entry are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightTable {
    weights: BTreeMap<String, f64>,
    default_weight: Option<f64>,
}

impl WeightTable {
    pub fn new(weights: BTreeMap<String, f64>, default_weight: Option<f64>) -> Self {
        Self {
            weights,
            default_weight,
        }
    }

    /// Table built from parsed criteria. Unknown metrics are ignored.
    pub fn from_criteria(criteria: &[Criterion]) -> Self {
        let weights = criteria
            .iter()
            .map(|c| (c.name.clone(), c.weight))
            .collect();
        Self::new(weights, None)
    }

    /// The category's leaderboard table. Unknown metrics weigh 1.0.
    pub fn for_category(category: AgentCategory) -> Self {
        let weights = category
            .leaderboard_weights()
            .iter()
            .map(|(name, w)| (name.to_string(), *w))
            .collect();
        Self::new(weights, Some(1.0))
    }

    /// Weight applied to `metric`, if it participates in scoring.
    pub fn weight_of(&self, metric: &str) -> Option<f64> {
        self.weights.get(metric).copied().or(self.default_weight)
    }

    /// Weighted mean of `evaluation` under this table.
    pub fn score(&self, evaluation: &BTreeMap<String, f64>) -> Result<f64, ScoringError> {
        let mut numerator = 0.0;
        let mut total_weight = 0.0;
        for (metric, raw) in evaluation {
            if let Some(w) = self.weight_of(metric) {
                numerator += raw * w;
                total_weight += w;
            }
        }
        if total_weight <= 0.0 {
            return Err(ScoringError::NoScorableCriteria);
        }
        Ok(numerator / total_weight)
    }
}

/// Weighted score of an evaluation against parsed criteria.
pub fn weighted_score(
    evaluation: &BTreeMap<String, f64>,
    criteria: &[Criterion],
) -> Result<f64, ScoringError> {
    WeightTable::from_criteria(criteria).score(evaluation)
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
