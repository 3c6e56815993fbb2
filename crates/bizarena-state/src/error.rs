//! Error types for bizarena-state

use thiserror::Error;

/// Errors produced by submission stores.
#[derive(Error, Debug)]
pub enum StorageError {
    /// No submission exists under this id
    #[error("submission not found: {submission_id}")]
    NotFound { submission_id: String },

    /// The id is already claimed by another submission
    #[error("submission already exists: {submission_id}")]
    AlreadyExists { submission_id: String },

    /// The submission exists but is incomplete or fails its digest check
    #[error("submission {submission_id} is corrupt: {reason}")]
    Corrupt {
        submission_id: String,
        reason: String,
    },

    /// The id cannot be used as a storage key
    #[error("invalid submission id: {submission_id:?}")]
    InvalidId { submission_id: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Whether a scan may skip the entry that produced this error instead of
    /// aborting. True for entries that are absent, half-written or unreadable.
    pub fn is_skippable(&self) -> bool {
        match self {
            StorageError::NotFound { .. }
            | StorageError::Corrupt { .. }
            | StorageError::Serialization(_) => true,
            StorageError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            StorageError::AlreadyExists { .. } | StorageError::InvalidId { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_mentions_id() {
        let err = StorageError::NotFound {
            submission_id: "20260101_alpha".to_string(),
        };
        assert!(err.to_string().contains("20260101_alpha"));
    }

    #[test]
    fn corrupt_entries_are_skippable() {
        let err = StorageError::Corrupt {
            submission_id: "x".to_string(),
            reason: "metadata.json missing".to_string(),
        };
        assert!(err.is_skippable());
        assert!(!StorageError::AlreadyExists {
            submission_id: "x".to_string()
        }
        .is_skippable());
    }

    #[test]
    fn io_not_found_is_skippable_other_io_is_not() {
        let gone = StorageError::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(gone.is_skippable());
        let denied = StorageError::Io(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert!(!denied.is_skippable());
    }
}
