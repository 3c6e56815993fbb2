//! Verification: re-run a random sample of a submission's tasks and compare
//! the fresh scores with the submitted ones.

use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use tokio::sync::Mutex;
use tracing::instrument;

use bizarena_state::{ScoreDetails, SubmissionStore, TaskOutcome, VerificationRecord};

use crate::benchmark::{BenchmarkRunner, BenchmarkTask};
use crate::collaborators::Agent;
use crate::domain::{ArenaError, Result};
use crate::obs;
use crate::scoring::mean;

/// Maximum relative score difference that still passes.
pub const DEFAULT_TOLERANCE: f64 = 0.10;

/// Relative difference between submitted and verified averages.
///
/// Falls back to the absolute verified average when the submitted average is
/// zero.
pub fn score_diff(submitted_avg: f64, verified_avg: f64) -> f64 {
    if submitted_avg == 0.0 {
        verified_avg.abs()
    } else {
        (submitted_avg - verified_avg).abs() / submitted_avg.abs()
    }
}

/// Per-task average scores of `outcomes`, in order, skipping unscorable ones.
fn task_averages<'a>(outcomes: impl IntoIterator<Item = &'a TaskOutcome>) -> Vec<f64> {
    outcomes
        .into_iter()
        .filter_map(TaskOutcome::average_score)
        .collect()
}

pub struct VerificationRunner {
    runner: Arc<BenchmarkRunner>,
    store: Arc<dyn SubmissionStore>,
    tolerance: f64,
    rng: Mutex<StdRng>,
}

impl VerificationRunner {
    /// `runner` must have had `initialize_tasks` called; `verify` rejects a
    /// sample containing an uninitialized task.
    pub fn new(runner: Arc<BenchmarkRunner>, store: Arc<dyn SubmissionStore>) -> Self {
        Self {
            runner,
            store,
            tolerance: DEFAULT_TOLERANCE,
            rng: Mutex::new(StdRng::seed_from_u64(rand::random())),
        }
    }

    /// Use a deterministic sampling sequence.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Pick `min(sample_size, task_count)` tasks without replacement, kept in
    /// declared order.
    async fn sample_tasks(&self, sample_size: usize) -> Result<Vec<Arc<dyn BenchmarkTask>>> {
        let tasks = self.runner.tasks();
        if tasks.is_empty() {
            return Err(ArenaError::InvalidConfiguration(
                "benchmark runner has no tasks to verify".to_string(),
            ));
        }
        let amount = sample_size.min(tasks.len());
        let mut indices = {
            let mut rng = self.rng.lock().await;
            sample(&mut *rng, tasks.len(), amount).into_vec()
        };
        indices.sort_unstable();
        Ok(indices.into_iter().map(|i| Arc::clone(&tasks[i])).collect())
    }

    /// Verify a submission and store the record, replacing any earlier one.
    #[instrument(skip(self, agent))]
    pub async fn verify(
        &self,
        submission_id: &str,
        agent_id: &str,
        agent: &dyn Agent,
        sample_size: usize,
    ) -> Result<VerificationRecord> {
        if sample_size == 0 {
            return Err(ArenaError::InvalidConfiguration(
                "verification sample size must be at least 1".to_string(),
            ));
        }

        let submission = self.store.get_submission(submission_id).await?;
        let sampled = self.sample_tasks(sample_size).await?;
        let names: Vec<String> = sampled.iter().map(|t| t.name().to_string()).collect();
        for task in &sampled {
            if !task.is_initialized().await {
                return Err(ArenaError::InvalidConfiguration(format!(
                    "task {} is not initialized; call initialize_tasks before verifying",
                    task.name()
                )));
            }
        }

        self.runner.initialize_sources().await?;
        let fresh = self.runner.run_tasks(agent, &sampled).await;

        let submitted = task_averages(
            names
                .iter()
                .filter_map(|name| submission.results.tasks.iter().find(|t| &t.task_name == name)),
        );
        let verified = task_averages(&fresh);

        let submitted_avg = mean(&submitted).unwrap_or(0.0);
        let verified_avg = mean(&verified).unwrap_or(0.0);
        let diff = score_diff(submitted_avg, verified_avg);

        let record = VerificationRecord {
            timestamp: Utc::now(),
            tasks_verified: names,
            submitted_avg,
            verified_avg,
            score_diff: diff,
            passed: diff <= self.tolerance,
            details: ScoreDetails {
                submitted,
                verified,
            },
        };

        self.store.put_verification(submission_id, &record).await?;
        obs::emit_verification_completed(
            submission_id,
            record.tasks_verified.len(),
            record.score_diff,
            record.passed,
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_score_diff() {
        assert!((score_diff(8.0, 7.5) - 0.0625).abs() < 1e-12);
        assert!((score_diff(8.0, 6.0) - 0.25).abs() < 1e-12);
        assert_eq!(score_diff(8.0, 8.0), 0.0);
    }

    #[test]
    fn test_zero_submitted_average_falls_back_to_absolute() {
        assert_eq!(score_diff(0.0, 0.0), 0.0);
        assert_eq!(score_diff(0.0, 3.0), 3.0);
    }

    #[test]
    fn test_task_averages_skip_failed_outcomes() {
        let outcomes = vec![
            TaskOutcome::succeeded(
                "a",
                serde_json::Value::Null,
                [("x".to_string(), 6.0), ("y".to_string(), 8.0)].into(),
            ),
            TaskOutcome::failed("b", "boom"),
        ];
        assert_eq!(task_averages(&outcomes), vec![7.0]);
    }
}
