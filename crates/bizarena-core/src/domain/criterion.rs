//! Evaluation criteria as produced by the criteria parser.

use serde::{Deserialize, Serialize};

use crate::domain::error::{ArenaError, Result};

fn default_weight() -> f64 {
    1.0
}

fn default_min_score() -> f64 {
    1.0
}

fn default_max_score() -> f64 {
    10.0
}

/// A named, weighted evaluation dimension.
///
/// `weight` is a relative multiplier; weights across a criteria set need not
/// sum to one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Criterion {
    pub name: String,
    pub description: String,
    pub scoring_guide: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    #[serde(default = "default_max_score")]
    pub max_score: f64,
}

impl Criterion {
    /// Create a criterion with weight 1.0 on a 1–10 scale.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        scoring_guide: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            scoring_guide: scoring_guide.into(),
            weight: default_weight(),
            min_score: default_min_score(),
            max_score: default_max_score(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_range(mut self, min_score: f64, max_score: f64) -> Self {
        self.min_score = min_score;
        self.max_score = max_score;
        self
    }

    /// Reject criteria the scoring model cannot use.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| ArenaError::InvalidCriterion {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        if !self.weight.is_finite() || self.weight <= 0.0 {
            return Err(invalid("weight must be a finite number greater than zero"));
        }
        if self.min_score >= self.max_score {
            return Err(invalid("min_score must be below max_score"));
        }
        Ok(())
    }
}

/// Validate every criterion in a parsed set.
pub fn validate_criteria(criteria: &[Criterion]) -> Result<()> {
    criteria.iter().try_for_each(Criterion::validate)
}
