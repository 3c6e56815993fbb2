use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::StorageError;
use crate::records::{
    validate_submission_id, Submission, SubmissionMetadata, VerificationRecord,
};
use crate::storage_traits::{StorageResult, SubmissionStore};

const METADATA_FILE: &str = "metadata.json";
const RESULTS_FILE: &str = "results.json";
const VERIFICATION_FILE: &str = "verification.json";

/// Filesystem-backed submission store.
///
/// Layout: `<root>/<submission_id>/{metadata.json, results.json, verification.json}`
///
/// The submission directory is created with `create_dir`, which doubles as the
/// atomic id claim. `results.json` is written before `metadata.json`, so an
/// entry without metadata is always a registration still in flight.
#[derive(Debug, Clone)]
pub struct FsSubmissionStore {
    root: PathBuf,
}

impl FsSubmissionStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn submission_dir(&self, submission_id: &str) -> StorageResult<PathBuf> {
        validate_submission_id(submission_id)?;
        Ok(self.root.join(submission_id))
    }
}

// Atomic write: temp file in the same directory, then rename over the target.
fn write_atomic(dir: &Path, name: &str, content: &[u8]) -> StorageResult<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.persist(dir.join(name)).map_err(|e| e.error)?;
    Ok(())
}

fn write_json_atomic<T: Serialize>(dir: &Path, name: &str, value: &T) -> StorageResult<()> {
    write_atomic(dir, name, &serde_json::to_vec_pretty(value)?)
}

fn read_bytes(path: &Path) -> StorageResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::Io(e)),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> StorageResult<Option<T>> {
    match read_bytes(path)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

fn create_blocking(dir: PathBuf, submission: Submission) -> StorageResult<()> {
    let id = submission.id().to_string();
    let document = submission.results.to_document()?;
    submission.metadata.check_results_document(&document)?;
    if let Err(e) = fs::create_dir(&dir) {
        return Err(if e.kind() == std::io::ErrorKind::AlreadyExists {
            StorageError::AlreadyExists { submission_id: id }
        } else {
            StorageError::Io(e)
        });
    }
    write_atomic(&dir, RESULTS_FILE, &document)?;
    write_json_atomic(&dir, METADATA_FILE, &submission.metadata)?;
    Ok(())
}

fn load_blocking(dir: &Path, submission_id: &str) -> StorageResult<Submission> {
    if !dir.is_dir() {
        return Err(StorageError::NotFound {
            submission_id: submission_id.to_string(),
        });
    }
    let corrupt = |reason: &str| StorageError::Corrupt {
        submission_id: submission_id.to_string(),
        reason: reason.to_string(),
    };
    let metadata: SubmissionMetadata = read_json(&dir.join(METADATA_FILE))?
        .ok_or_else(|| corrupt("metadata.json missing (registration in progress?)"))?;
    if metadata.submission_id != submission_id {
        return Err(corrupt("metadata submission_id does not match directory"));
    }

    // The digest covers the stored bytes; parsing may not reproduce them exactly.
    let document =
        read_bytes(&dir.join(RESULTS_FILE))?.ok_or_else(|| corrupt("results.json missing"))?;
    metadata.check_results_document(&document)?;
    let results = serde_json::from_slice(&document)?;

    Ok(Submission { metadata, results })
}

fn list_blocking(root: &Path) -> StorageResult<Vec<Submission>> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::Io(e)),
    };

    let mut ids = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if validate_submission_id(name).is_ok() {
                ids.push(name.to_string());
            }
        }
    }
    ids.sort();

    let mut submissions = Vec::with_capacity(ids.len());
    for id in ids {
        match load_blocking(&root.join(&id), &id) {
            Ok(sub) => submissions.push(sub),
            Err(e) if e.is_skippable() => {
                warn!(event = "store.entry_skipped", submission_id = %id, error = %e);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(submissions)
}

async fn blocking<T, F>(f: F) -> StorageResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> StorageResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StorageError::Io(std::io::Error::other(e)))?
}

#[async_trait]
impl SubmissionStore for FsSubmissionStore {
    async fn create_submission(&self, submission: &Submission) -> StorageResult<()> {
        let dir = self.submission_dir(submission.id())?;
        let submission = submission.clone();
        blocking(move || create_blocking(dir, submission)).await
    }

    async fn get_submission(&self, submission_id: &str) -> StorageResult<Submission> {
        let dir = self.submission_dir(submission_id)?;
        let id = submission_id.to_string();
        blocking(move || load_blocking(&dir, &id)).await
    }

    async fn list_submissions(&self) -> StorageResult<Vec<Submission>> {
        let root = self.root.clone();
        blocking(move || list_blocking(&root)).await
    }

    async fn put_verification(
        &self,
        submission_id: &str,
        record: &VerificationRecord,
    ) -> StorageResult<()> {
        let dir = self.submission_dir(submission_id)?;
        let id = submission_id.to_string();
        let record = record.clone();
        blocking(move || {
            if !dir.join(METADATA_FILE).is_file() {
                return Err(StorageError::NotFound { submission_id: id });
            }
            write_json_atomic(&dir, VERIFICATION_FILE, &record)
        })
        .await
    }

    async fn get_verification(
        &self,
        submission_id: &str,
    ) -> StorageResult<Option<VerificationRecord>> {
        let dir = self.submission_dir(submission_id)?;
        let id = submission_id.to_string();
        blocking(move || {
            if !dir.is_dir() {
                return Err(StorageError::NotFound { submission_id: id });
            }
            read_json(&dir.join(VERIFICATION_FILE))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{BenchmarkRun, Evaluation, TaskOutcome};
    use chrono::Utc;
    use serde_json::json;

    fn make_store() -> (tempfile::TempDir, FsSubmissionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSubmissionStore::new(dir.path().join("submissions")).unwrap();
        (dir, store)
    }

    fn submission(id: &str) -> Submission {
        let run = BenchmarkRun {
            agent_id: "alpha".to_string(),
            timestamp: Utc::now(),
            tasks: vec![TaskOutcome::succeeded(
                "sales_analysis",
                json!({"analysis": "grow"}),
                Evaluation::from([("insight_depth".to_string(), 7.0)]),
            )],
        };
        Submission::seal(id, "alpha", "business_analyst", Utc::now(), json!({}), run).unwrap()
    }

    #[tokio::test]
    async fn writes_expected_layout() {
        let (_dir, store) = make_store();
        store.create_submission(&submission("20260101_alpha")).await.unwrap();

        let sub_dir = store.root().join("20260101_alpha");
        assert!(sub_dir.join(METADATA_FILE).is_file());
        assert!(sub_dir.join(RESULTS_FILE).is_file());
        assert!(!sub_dir.join(VERIFICATION_FILE).exists());
    }

    #[tokio::test]
    async fn metadata_missing_is_reported_as_corrupt() {
        let (_dir, store) = make_store();
        let sub_dir = store.root().join("20260101_partial");
        fs::create_dir(&sub_dir).unwrap();
        fs::write(sub_dir.join(RESULTS_FILE), b"{}").unwrap();

        match store.get_submission("20260101_partial").await {
            Err(StorageError::Corrupt { reason, .. }) => assert!(reason.contains("metadata")),
            other => panic!("expected Corrupt, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn list_skips_partial_and_stray_files() {
        let (_dir, store) = make_store();
        store.create_submission(&submission("20260101_alpha")).await.unwrap();

        // In-flight registration: directory claimed, metadata not yet written.
        fs::create_dir(store.root().join("20260101_beta")).unwrap();
        fs::write(store.root().join("README.txt"), b"not a submission").unwrap();

        let listed = store.list_submissions().await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["20260101_alpha"]);
    }

    #[tokio::test]
    async fn list_skips_tampered_results() {
        let (_dir, store) = make_store();
        store.create_submission(&submission("20260101_alpha")).await.unwrap();
        store.create_submission(&submission("20260101_gamma")).await.unwrap();

        let results = store.root().join("20260101_gamma").join(RESULTS_FILE);
        fs::write(
            &results,
            br#"{"agent_id":"alpha","timestamp":"2026-01-01T00:00:00Z","tasks":[]}"#,
        )
        .unwrap();

        let listed = store.list_submissions().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id(), "20260101_alpha");
    }

    fn run_with(tasks: Vec<TaskOutcome>) -> BenchmarkRun {
        BenchmarkRun {
            agent_id: "alpha".to_string(),
            timestamp: Utc::now(),
            tasks,
        }
    }

    #[tokio::test]
    async fn computed_scores_survive_storage() {
        let (_dir, store) = make_store();
        let mut ids = Vec::new();
        for i in 0..50u32 {
            let x = f64::from(i);
            let eval = Evaluation::from([
                ("thirds".to_string(), 7.0 * (x + 1.0) / 3.0),
                ("weighted".to_string(), (x * 0.1 + 0.2) * 1.5),
                ("root".to_string(), (x + 2.0).sqrt() * 7.3),
                ("tiny".to_string(), 1.0 / (x + 7.0) / 3.0e5),
            ]);
            let run = run_with(vec![TaskOutcome::succeeded("t", json!({"i": i}), eval)]);
            let id = format!("20260101_agent-{i}");
            let sub = Submission::seal(&id, "alpha", "general_purpose", Utc::now(), json!({}), run)
                .unwrap();
            store.create_submission(&sub).await.unwrap();

            let loaded = store.get_submission(&id).await.unwrap();
            assert_eq!(loaded, sub);
            ids.push(id);
        }

        let listed = store.list_submissions().await.unwrap();
        assert_eq!(listed.len(), ids.len());
    }

    #[tokio::test]
    async fn null_task_result_is_stored_and_listed() {
        let (_dir, store) = make_store();
        let run = run_with(vec![TaskOutcome::succeeded(
            "t",
            json!(null),
            Evaluation::from([("c".to_string(), 7.0)]),
        )]);
        let sub = Submission::seal("20260101_n", "n", "general_purpose", Utc::now(), json!({}), run)
            .unwrap();
        store.create_submission(&sub).await.unwrap();

        let loaded = store.get_submission("20260101_n").await.unwrap();
        assert_eq!(loaded.results.tasks[0].result, Some(serde_json::Value::Null));
        assert_eq!(store.list_submissions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_rejects_results_edited_after_sealing() {
        let (_dir, store) = make_store();
        let mut sub = submission("20260101_alpha");
        sub.results.tasks.clear();
        match store.create_submission(&sub).await {
            Err(StorageError::Corrupt { .. }) => {}
            other => panic!("expected Corrupt, got {other:?}"),
        }
        assert!(!store.root().join("20260101_alpha").exists());
    }

    #[tokio::test]
    async fn path_traversal_ids_are_rejected() {
        let (_dir, store) = make_store();
        match store.get_submission("../outside").await {
            Err(StorageError::InvalidId { .. }) => {}
            other => panic!("expected InvalidId, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_root_lists_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSubmissionStore::new(dir.path().join("s")).unwrap();
        fs::remove_dir(store.root()).unwrap();
        assert!(store.list_submissions().await.unwrap().is_empty());
    }
}
