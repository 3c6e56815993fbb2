//! Persisted record shapes.
//!
//! A submission is stored as two documents: [`SubmissionMetadata`] and the
//! [`BenchmarkRun`] it describes. An optional [`VerificationRecord`] sits next
//! to them and is the only part that may be replaced after registration.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::StorageError;
use crate::StorageResult;

/// Criterion name → weighted score, as produced by a task evaluation.
pub type Evaluation = BTreeMap<String, f64>;

// ---------------------------------------------------------------------------
// ContentDigest
// ---------------------------------------------------------------------------

/// SHA-256 hex digest of a stored document's bytes.
///
/// The inner field is private so the value is always 64 lowercase hex chars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Digest of raw bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentDigest(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("invalid content digest: {s:?}"));
        }
        Ok(ContentDigest(s.to_ascii_lowercase()))
    }
}

impl From<ContentDigest> for String {
    fn from(d: ContentDigest) -> Self {
        d.0
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Task outcomes and benchmark runs
// ---------------------------------------------------------------------------

/// Outcome of one benchmark task.
///
/// A failed task carries `error` and no `evaluation`; it never affects the
/// outcomes of its siblings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskOutcome {
    pub task_name: String,
    /// Absent for failed tasks; an explicit JSON `null` result stays `Some(Null)`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_value"
    )]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Evaluation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskOutcome {
    pub fn succeeded(
        task_name: impl Into<String>,
        result: serde_json::Value,
        evaluation: Evaluation,
    ) -> Self {
        Self {
            task_name: task_name.into(),
            result: Some(result),
            evaluation: Some(evaluation),
            error: None,
        }
    }

    pub fn failed(task_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            task_name: task_name.into(),
            result: None,
            evaluation: None,
            error: Some(error.into()),
        }
    }

    /// The evaluation, if present and non-empty.
    pub fn scorable_evaluation(&self) -> Option<&Evaluation> {
        self.evaluation.as_ref().filter(|e| !e.is_empty())
    }

    /// Mean of the evaluation's criterion scores.
    pub fn average_score(&self) -> Option<f64> {
        let eval = self.scorable_evaluation()?;
        Some(eval.values().sum::<f64>() / eval.len() as f64)
    }
}

fn present_value<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

/// Results document of one benchmark run, tasks in declared order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenchmarkRun {
    pub agent_id: String,
    pub timestamp: DateTime<Utc>,
    pub tasks: Vec<TaskOutcome>,
}

impl BenchmarkRun {
    /// The exact bytes stored as `results.json`. The results digest covers
    /// these bytes, never a re-encoding of parsed values.
    pub fn to_document(&self) -> StorageResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

// ---------------------------------------------------------------------------
// Submissions
// ---------------------------------------------------------------------------

/// Registration metadata for a submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionMetadata {
    pub submission_id: String,
    pub agent_name: String,
    pub category: String,
    pub submitted_at: DateTime<Utc>,
    /// Digest of `results.json`; readers reject entries that do not match.
    pub results_digest: ContentDigest,
    /// Caller-supplied metadata, stored verbatim.
    #[serde(default)]
    pub extra: serde_json::Value,
}

/// A registered submission: metadata plus the run it describes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Submission {
    pub metadata: SubmissionMetadata,
    pub results: BenchmarkRun,
}

impl Submission {
    /// Build a submission, computing the results digest.
    pub fn seal(
        submission_id: impl Into<String>,
        agent_name: impl Into<String>,
        category: impl Into<String>,
        submitted_at: DateTime<Utc>,
        extra: serde_json::Value,
        results: BenchmarkRun,
    ) -> StorageResult<Self> {
        let results_digest = ContentDigest::from_bytes(&results.to_document()?);
        Ok(Self {
            metadata: SubmissionMetadata {
                submission_id: submission_id.into(),
                agent_name: agent_name.into(),
                category: category.into(),
                submitted_at,
                results_digest,
                extra,
            },
            results,
        })
    }

    pub fn id(&self) -> &str {
        &self.metadata.submission_id
    }

    /// Recompute the digest of the in-memory results and compare it with the
    /// sealed one.
    pub fn verify_digest(&self) -> StorageResult<()> {
        self.metadata.check_results_document(&self.results.to_document()?)
    }
}

impl SubmissionMetadata {
    /// Check raw `results.json` bytes against the sealed digest.
    pub fn check_results_document(&self, document: &[u8]) -> StorageResult<()> {
        let actual = ContentDigest::from_bytes(document);
        if actual != self.results_digest {
            return Err(StorageError::Corrupt {
                submission_id: self.submission_id.clone(),
                reason: format!(
                    "results digest mismatch: expected {}, got {}",
                    self.results_digest.short(),
                    actual.short()
                ),
            });
        }
        Ok(())
    }
}

/// Validate that `id` can be used as a storage key (and a path component).
pub fn validate_submission_id(id: &str) -> StorageResult<()> {
    let valid = !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidId {
            submission_id: id.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Per-task average scores compared during verification.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScoreDetails {
    pub submitted: Vec<f64>,
    pub verified: Vec<f64>,
}

/// Result of re-running a sample of a submission's tasks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerificationRecord {
    pub timestamp: DateTime<Utc>,
    pub tasks_verified: Vec<String>,
    pub submitted_avg: f64,
    pub verified_avg: f64,
    pub score_diff: f64,
    pub passed: bool,
    #[serde(default)]
    pub details: ScoreDetails,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run() -> BenchmarkRun {
        BenchmarkRun {
            agent_id: "agent-1".to_string(),
            timestamp: DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
                .expect("parse RFC3339")
                .with_timezone(&Utc),
            tasks: vec![
                TaskOutcome::succeeded(
                    "lead_qualification",
                    json!({"analysis": "ok"}),
                    Evaluation::from([("accuracy".to_string(), 8.0), ("tone".to_string(), 6.0)]),
                ),
                TaskOutcome::failed("pipeline_review", "agent timed out"),
            ],
        }
    }

    #[test]
    fn average_score_is_mean_of_criteria() {
        let run = run();
        assert_eq!(run.tasks[0].average_score(), Some(7.0));
        assert_eq!(run.tasks[1].average_score(), None);
    }

    #[test]
    fn empty_evaluation_is_not_scorable() {
        let outcome = TaskOutcome::succeeded("t", json!(null), Evaluation::new());
        assert!(outcome.scorable_evaluation().is_none());
        assert!(outcome.average_score().is_none());
    }

    #[test]
    fn failed_outcome_omits_empty_fields_in_json() {
        let value = serde_json::to_value(TaskOutcome::failed("t", "boom")).unwrap();
        assert_eq!(value, json!({"task_name": "t", "error": "boom"}));
    }

    #[test]
    fn sealed_submission_passes_digest_check() {
        let sub = Submission::seal(
            "20260101_alpha",
            "alpha",
            "sales_development",
            Utc::now(),
            json!({}),
            run(),
        )
        .unwrap();
        sub.verify_digest().unwrap();
    }

    #[test]
    fn tampered_results_fail_digest_check() {
        let mut sub = Submission::seal(
            "20260101_alpha",
            "alpha",
            "sales_development",
            Utc::now(),
            json!({}),
            run(),
        )
        .unwrap();
        sub.results.tasks.pop();
        match sub.verify_digest() {
            Err(StorageError::Corrupt { submission_id, .. }) => {
                assert_eq!(submission_id, "20260101_alpha")
            }
            other => panic!("expected Corrupt, got {other:?}"),
        }
    }

    #[test]
    fn null_result_survives_a_json_round_trip() {
        let outcome =
            TaskOutcome::succeeded("t", json!(null), Evaluation::from([("c".to_string(), 7.0)]));
        let text = serde_json::to_string(&outcome).unwrap();
        assert!(text.contains("\"result\":null"));
        let back: TaskOutcome = serde_json::from_str(&text).unwrap();
        assert_eq!(back.result, Some(serde_json::Value::Null));
        assert_eq!(back, outcome);

        let failed: TaskOutcome = serde_json::from_str(r#"{"task_name":"t","error":"boom"}"#).unwrap();
        assert_eq!(failed.result, None);
    }

    #[test]
    fn digest_is_checked_against_raw_document_bytes() {
        let sub = Submission::seal("20260101_alpha", "alpha", "sales_development", Utc::now(), json!({}), run())
            .unwrap();
        let document = sub.results.to_document().unwrap();
        sub.metadata.check_results_document(&document).unwrap();

        let mut edited = document.clone();
        edited.push(b'\n');
        assert!(matches!(
            sub.metadata.check_results_document(&edited),
            Err(StorageError::Corrupt { .. })
        ));
    }

    #[test]
    fn content_digest_rejects_bad_hex() {
        let parsed: std::result::Result<ContentDigest, _> = serde_json::from_str("\"abcd\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn submission_id_validation() {
        assert!(validate_submission_id("20260101_alpha-2").is_ok());
        assert!(validate_submission_id("").is_err());
        assert!(validate_submission_id("../etc").is_err());
        assert!(validate_submission_id(".hidden").is_err());
        assert!(validate_submission_id("a/b").is_err());
    }
}
