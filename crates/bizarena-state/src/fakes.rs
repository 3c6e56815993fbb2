//! In-memory fake for `SubmissionStore` (testing only)
//!
//! `MemorySubmissionStore` satisfies the trait contract without touching the
//! filesystem.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::records::{validate_submission_id, Submission, VerificationRecord};
use crate::storage_traits::{StorageResult, SubmissionStore};

#[derive(Debug)]
struct Entry {
    submission: Submission,
    verification: Option<VerificationRecord>,
}

/// In-memory submission store backed by a `BTreeMap<id, Entry>`.
#[derive(Debug, Default)]
pub struct MemorySubmissionStore {
    entries: Mutex<BTreeMap<String, Entry>>,
}

impl MemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored submissions.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn not_found(submission_id: &str) -> StorageError {
    StorageError::NotFound {
        submission_id: submission_id.to_string(),
    }
}

#[async_trait]
impl SubmissionStore for MemorySubmissionStore {
    async fn create_submission(&self, submission: &Submission) -> StorageResult<()> {
        validate_submission_id(submission.id())?;
        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(submission.id()) {
            return Err(StorageError::AlreadyExists {
                submission_id: submission.id().to_string(),
            });
        }
        entries.insert(
            submission.id().to_string(),
            Entry {
                submission: submission.clone(),
                verification: None,
            },
        );
        Ok(())
    }

    async fn get_submission(&self, submission_id: &str) -> StorageResult<Submission> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(submission_id)
            .map(|e| e.submission.clone())
            .ok_or_else(|| not_found(submission_id))
    }

    async fn list_submissions(&self) -> StorageResult<Vec<Submission>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.values().map(|e| e.submission.clone()).collect())
    }

    async fn put_verification(
        &self,
        submission_id: &str,
        record: &VerificationRecord,
    ) -> StorageResult<()> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .get_mut(submission_id)
            .ok_or_else(|| not_found(submission_id))?;
        entry.verification = Some(record.clone());
        Ok(())
    }

    async fn get_verification(
        &self,
        submission_id: &str,
    ) -> StorageResult<Option<VerificationRecord>> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(submission_id)
            .map(|e| e.verification.clone())
            .ok_or_else(|| not_found(submission_id))
    }
}
