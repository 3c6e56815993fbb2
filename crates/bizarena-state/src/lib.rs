//! bizarena-state: submission persistence for bizarena
//!
//! Stores one directory (or in-memory entry) per submission holding its
//! registration metadata, the benchmark results, and an optional verification
//! record.
//!
//! ## Key Components
//!
//! - `SubmissionStore`: async, append-only storage contract
//! - `FsSubmissionStore`: filesystem backend with atomic writes
//! - `fakes::MemorySubmissionStore`: in-memory backend for tests

mod error;
pub mod fakes;
pub mod fs_store;
pub mod records;
pub mod storage_traits;

pub use error::StorageError;
pub use fs_store::FsSubmissionStore;
pub use records::{
    validate_submission_id, BenchmarkRun, ContentDigest, Evaluation, ScoreDetails, Submission,
    SubmissionMetadata, TaskOutcome, VerificationRecord,
};
pub use storage_traits::{StorageResult, SubmissionStore};
