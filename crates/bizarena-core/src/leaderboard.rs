//! Leaderboard: per-category ranking of registered submissions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use bizarena_state::{BenchmarkRun, Submission, SubmissionStore, VerificationRecord};

use crate::domain::{AgentCategory, ArenaError, Result};
use crate::scoring::{mean, WeightTable};

/// One ranked submission. Derived on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub submission_id: String,
    pub agent_name: String,
    pub category: String,
    pub submitted_at: DateTime<Utc>,
    pub score: f64,
    /// A verification record exists and it passed.
    pub verified: bool,
    pub task_count: usize,
}

/// A submission with its verification record, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionDetails {
    #[serde(flatten)]
    pub submission: Submission,
    pub verification: Option<VerificationRecord>,
}

/// Category score of a run: the mean, over outcomes with a non-empty
/// evaluation, of the category-weighted outcome score. 0 when nothing is
/// scorable. Unknown category labels use the general-purpose table.
pub fn category_score(run: &BenchmarkRun, category_label: &str) -> f64 {
    let table = WeightTable::for_category(AgentCategory::from_label_or_general(category_label));
    let scores: Vec<f64> = run
        .tasks
        .iter()
        .filter_map(|t| t.scorable_evaluation())
        .filter_map(|eval| table.score(eval).ok())
        .collect();
    mean(&scores).unwrap_or(0.0)
}

/// Sort score descending, ties by submission id ascending.
pub fn sort_rankings(entries: &mut [RankingEntry]) {
    entries.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.submission_id.cmp(&b.submission_id))
    });
}

#[derive(Clone)]
pub struct Leaderboard {
    store: Arc<dyn SubmissionStore>,
}

impl Leaderboard {
    pub fn new(store: Arc<dyn SubmissionStore>) -> Self {
        Self { store }
    }

    /// Rank every fully written submission, optionally within one category.
    #[instrument(skip(self))]
    pub async fn rankings(&self, category: Option<AgentCategory>) -> Result<Vec<RankingEntry>> {
        let submissions = self.store.list_submissions().await?;
        let mut entries = Vec::with_capacity(submissions.len());

        for submission in submissions {
            let meta = &submission.metadata;
            if let Some(category) = category {
                if meta.category != category.as_str() {
                    continue;
                }
            }

            let verified = match self.store.get_verification(&meta.submission_id).await {
                Ok(record) => record.map(|r| r.passed).unwrap_or(false),
                Err(err) => {
                    warn!(submission_id = %meta.submission_id, error = %err, "verification record unreadable");
                    false
                }
            };

            entries.push(RankingEntry {
                submission_id: meta.submission_id.clone(),
                agent_name: meta.agent_name.clone(),
                category: meta.category.clone(),
                submitted_at: meta.submitted_at,
                score: category_score(&submission.results, &meta.category),
                verified,
                task_count: submission.results.tasks.len(),
            });
        }

        sort_rankings(&mut entries);
        Ok(entries)
    }

    /// The first `n` rankings.
    pub async fn top(&self, n: usize, category: Option<AgentCategory>) -> Result<Vec<RankingEntry>> {
        let mut entries = self.rankings(category).await?;
        entries.truncate(n);
        Ok(entries)
    }

    pub async fn submission_details(&self, submission_id: &str) -> Result<SubmissionDetails> {
        let submission = self.store.get_submission(submission_id).await?;
        let verification = self.store.get_verification(submission_id).await?;
        Ok(SubmissionDetails {
            submission,
            verification,
        })
    }

    pub async fn verification(&self, submission_id: &str) -> Result<VerificationRecord> {
        self.store
            .get_verification(submission_id)
            .await?
            .ok_or_else(|| ArenaError::VerificationNotFound(submission_id.to_string()))
    }
}
