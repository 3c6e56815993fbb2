//! Storage trait for bizarena submissions.
//!
//! `SubmissionStore` is async and backend-agnostic. A filesystem backend lives
//! in [`crate::fs_store`]; an in-memory fake for tests lives in [`crate::fakes`].

use async_trait::async_trait;

use crate::error::StorageError;
use crate::records::{Submission, VerificationRecord};

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Append-only submission store.
///
/// Guarantees:
/// - `create_submission` claims the id atomically; a second create with the
///   same id fails with `StorageError::AlreadyExists` and never overwrites.
/// - A stored submission's metadata and results are never modified.
/// - At most one verification record exists per submission; `put_verification`
///   replaces any previous record.
/// - `list_submissions` is a snapshot of fully written entries, ordered by id.
///   Entries that are mid-write or fail their digest check are skipped.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Persist a new submission under `submission.metadata.submission_id`.
    async fn create_submission(&self, submission: &Submission) -> StorageResult<()>;

    /// Load one submission. `StorageError::NotFound` if absent.
    async fn get_submission(&self, submission_id: &str) -> StorageResult<Submission>;

    /// Load every fully written submission, ordered by id.
    async fn list_submissions(&self) -> StorageResult<Vec<Submission>>;

    /// Write (or overwrite) the verification record of an existing submission.
    async fn put_verification(
        &self,
        submission_id: &str,
        record: &VerificationRecord,
    ) -> StorageResult<()>;

    /// Load the verification record, if one was written.
    async fn get_verification(
        &self,
        submission_id: &str,
    ) -> StorageResult<Option<VerificationRecord>>;
}
