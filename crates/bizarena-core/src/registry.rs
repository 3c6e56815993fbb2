//! Submission registration: id allocation and the append-only write.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, instrument};

use bizarena_state::{BenchmarkRun, StorageError, Submission, SubmissionStore};

use crate::domain::{AgentCategory, ArenaError, Result};
use crate::obs;

/// Upper bound on same-day resubmissions of one agent.
const MAX_SAME_DAY_SUBMISSIONS: usize = 10_000;

/// Make `agent_name` safe as a path component: characters outside
/// `[A-Za-z0-9_-]` become `-`.
pub fn sanitize_agent_name(agent_name: &str) -> Result<String> {
    let trimmed = agent_name.trim();
    if trimmed.is_empty() {
        return Err(ArenaError::InvalidConfiguration(
            "agent name must not be empty".to_string(),
        ));
    }
    Ok(trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect())
}

/// Registers benchmark runs as immutable submissions.
#[derive(Clone)]
pub struct SubmissionRegistry {
    store: Arc<dyn SubmissionStore>,
}

impl SubmissionRegistry {
    pub fn new(store: Arc<dyn SubmissionStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn SubmissionStore> {
        &self.store
    }

    /// Register `results` for `agent_name` and return the new submission id.
    pub async fn register_submission(
        &self,
        agent_name: &str,
        category: AgentCategory,
        metadata: Value,
        results: BenchmarkRun,
    ) -> Result<String> {
        self.register_submission_at(agent_name, category, metadata, results, Utc::now())
            .await
    }

    /// Register with an explicit submission time.
    ///
    /// The id is `<YYYYMMDD>_<agent>`; later same-day submissions get
    /// `_2`, `_3`, … Ids are claimed by the store, so concurrent registrations
    /// never overwrite each other.
    #[instrument(skip(self, metadata, results), fields(category = %category))]
    pub async fn register_submission_at(
        &self,
        agent_name: &str,
        category: AgentCategory,
        metadata: Value,
        results: BenchmarkRun,
        submitted_at: DateTime<Utc>,
    ) -> Result<String> {
        let base = format!(
            "{}_{}",
            submitted_at.format("%Y%m%d"),
            sanitize_agent_name(agent_name)?
        );
        let task_count = results.tasks.len();
        let mut submission = Submission::seal(
            base.clone(),
            agent_name.trim(),
            category.as_str(),
            submitted_at,
            metadata,
            results,
        )?;

        for n in 1..=MAX_SAME_DAY_SUBMISSIONS {
            let id = if n == 1 {
                base.clone()
            } else {
                format!("{base}_{n}")
            };
            submission.metadata.submission_id = id.clone();

            match self.store.create_submission(&submission).await {
                Ok(()) => {
                    obs::emit_submission_registered(&id, agent_name, task_count);
                    return Ok(id);
                }
                Err(StorageError::AlreadyExists { .. }) => {
                    debug!(submission_id = %id, "submission id taken, trying next suffix");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(ArenaError::InvalidConfiguration(format!(
            "more than {MAX_SAME_DAY_SUBMISSIONS} submissions for {base} on one day"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_agent_name() {
        assert_eq!(sanitize_agent_name("  sdr-bot_v2 ").unwrap(), "sdr-bot_v2");
        assert_eq!(sanitize_agent_name("../etc/passwd").unwrap(), "---etc-passwd");
        assert_eq!(sanitize_agent_name("Acme SDR 3.1").unwrap(), "Acme-SDR-3-1");
        assert!(sanitize_agent_name("   ").is_err());
    }
}
