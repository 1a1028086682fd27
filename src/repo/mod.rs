//! The repository layer.
//!
//! Everything the store needs from the version-control engine, behind a
//! narrow surface: stage, commit, read-tree, per-path log. Upper layers
//! never touch `git2` directly.

mod handle;
mod ignore;
mod revision;
mod snapshot;

pub use handle::{CommitSignature, GitRepository};
pub use ignore::{IgnoreList, IGNORE_FILE};
pub use revision::{CommitMessage, RevisionId, RevisionInfo};
pub use snapshot::Snapshot;
