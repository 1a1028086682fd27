//! Error types for the record store.
//!
//! Precondition violations (duplicate key, missing key) are always surfaced
//! to the caller; substrate failures (git, filesystem, JSON) propagate as
//! distinct variants so callers can tell "your request was invalid" from
//! "the storage underneath failed". Nothing is retried internally.

use thiserror::Error;

use crate::record::{InvalidNameError, ModelName, RecordKey};

/// The main error type for store operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The path given at open time is not a usable git working directory.
    #[error("invalid repository: {0}")]
    Repository(String),

    /// The requested model is excluded by the ignore list.
    #[error("unknown model: {0}")]
    UnknownModel(ModelName),

    /// A record with this key already exists (create only).
    #[error("duplicate key: model={model}, key={key}")]
    DuplicateKey { model: ModelName, key: RecordKey },

    /// The requested record does not exist in the committed tree.
    #[error("record not found: model={model}, key={key}")]
    NotFound { model: ModelName, key: RecordKey },

    /// `commit` was called with nothing staged.
    #[error("nothing staged for commit")]
    NothingStaged,

    /// The engine refused to create the commit. The stage has been rolled
    /// back to HEAD before this error is returned.
    #[error("commit rejected: {0}")]
    CommitRejected(#[source] git2::Error),

    /// A record file could not be decoded in a direct-read context.
    ///
    /// During scans the same condition is a warning-level diagnostic and
    /// the entry is skipped instead.
    #[error("corrupt record at {path}: {reason}")]
    CorruptRecord { path: String, reason: String },

    /// A payload value was not a JSON object.
    #[error("record payload must be a JSON object")]
    NotAnObject,

    /// Invalid model or record name.
    #[error("invalid name: {0}")]
    InvalidName(#[from] InvalidNameError),

    /// Error from the underlying git library.
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error at the filesystem level.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True if this error means the requested thing does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NotFound { .. } | Error::UnknownModel(_)
        )
    }

    /// True if this error is a logical precondition conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::DuplicateKey { .. })
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        let not_found = Error::NotFound {
            model: ModelName::new("widgets").unwrap(),
            key: RecordKey::new("a").unwrap(),
        };
        assert!(not_found.is_not_found());
        assert!(!not_found.is_conflict());

        let conflict = Error::DuplicateKey {
            model: ModelName::new("widgets").unwrap(),
            key: RecordKey::new("a").unwrap(),
        };
        assert!(conflict.is_conflict());
        assert!(!conflict.is_not_found());
    }
}
