//! Revision identity and commit metadata.
//!
//! Every mutation of the store produces exactly one revision. This module
//! carries the typed revision id, the metadata view of a commit, and the
//! deterministic one-line message format each operation commits with.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use git2::Oid;

/// Identifier of one committed revision.
///
/// A newtype so a revision id cannot be confused with a blob or tree id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RevisionId(pub(crate) Oid);

impl RevisionId {
    pub(crate) fn new(oid: Oid) -> Self {
        Self(oid)
    }

    pub(crate) fn raw(&self) -> Oid {
        self.0
    }

    /// Parse a RevisionId from a hex string.
    pub fn from_hex(hex: &str) -> Result<Self, git2::Error> {
        Oid::from_str(hex).map(RevisionId)
    }

    /// Short (7 character) form of the revision id.
    pub fn short(&self) -> String {
        self.0.to_string()[..7].to_string()
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata of one revision.
#[derive(Debug, Clone)]
pub struct RevisionInfo {
    pub id: RevisionId,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: DateTime<Utc>,
}

impl RevisionInfo {
    pub(crate) fn from_git2(commit: &git2::Commit<'_>) -> Self {
        let author = commit.author();
        Self {
            id: RevisionId::new(commit.id()),
            message: commit.message().unwrap_or("").to_string(),
            author_name: author.name().unwrap_or("Unknown").to_string(),
            author_email: author.email().unwrap_or("unknown@unknown").to_string(),
            timestamp: commit_timestamp(commit.time()),
        }
    }

    /// First line of the commit message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or(&self.message)
    }
}

/// Convert a git commit time to a UTC timestamp.
pub(crate) fn commit_timestamp(time: git2::Time) -> DateTime<Utc> {
    Utc.timestamp_opt(time.seconds(), 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Deterministic message formatting for store operations.
///
/// Every message is a single line of the form `<operation> <model>/<key>`.
pub struct CommitMessage;

impl CommitMessage {
    /// Message for a create operation.
    pub fn create(model: &str, key: &str) -> String {
        format!("create {}/{}", model, key)
    }

    /// Message for an update operation.
    pub fn update(model: &str, key: &str) -> String {
        format!("update {}/{}", model, key)
    }

    /// Message for a delete operation.
    pub fn delete(model: &str, key: &str) -> String {
        format!("delete {}/{}", model, key)
    }
}
