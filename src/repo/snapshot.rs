//! Immutable views of the committed tree.
//!
//! A [`Snapshot`] captures one revision (commit and root tree id) and
//! resolves reads against it lazily. It never sees the working tree or the
//! index, so a snapshot taken before a mutation keeps answering from the
//! old revision. On an unborn branch the snapshot is simply empty.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use git2::{ObjectType, Oid};

use crate::error::Result;
use crate::record::{ModelName, RecordKey, RecordPath};
use crate::repo::handle::RepoInner;
use crate::repo::revision::RevisionId;

/// The resolved head of a snapshot: revision, root tree, commit time.
#[derive(Debug, Clone)]
pub(crate) struct SnapshotHead {
    pub(crate) revision: RevisionId,
    pub(crate) tree: Oid,
    pub(crate) timestamp: DateTime<Utc>,
}

/// An immutable, lazily-walkable view of the tree at one revision.
///
/// Cheap to clone; safe to share across any number of readers.
#[derive(Clone)]
pub struct Snapshot {
    inner: Arc<RepoInner>,
    head: Option<SnapshotHead>,
}

impl Snapshot {
    pub(crate) fn new(inner: Arc<RepoInner>, head: Option<SnapshotHead>) -> Self {
        Self { inner, head }
    }

    /// The revision this snapshot was taken at; `None` on an unborn branch.
    pub fn revision(&self) -> Option<RevisionId> {
        self.head.as_ref().map(|head| head.revision)
    }

    /// Commit timestamp of the snapshot revision.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.head.as_ref().map(|head| head.timestamp)
    }

    /// True if there is no committed tree behind this snapshot.
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Top-level subtrees that carry valid model names, sorted.
    ///
    /// This is the raw tree view: ignored prefixes are still present here
    /// and are filtered out by the model registry.
    pub fn models(&self) -> Result<Vec<ModelName>> {
        let Some(head) = &self.head else {
            return Ok(Vec::new());
        };
        let repo = self.inner.repo.read();
        let tree = repo.find_tree(head.tree)?;

        let mut models: Vec<ModelName> = tree
            .iter()
            .filter_map(|entry| {
                if entry.kind() != Some(ObjectType::Tree) {
                    return None;
                }
                ModelName::new(entry.name()?).ok()
            })
            .collect();
        models.sort();
        Ok(models)
    }

    /// Sorted `(key, blob id)` listing of one model's records.
    ///
    /// One level deep: subtrees and entries without a `.json` suffix are
    /// not records. An absent model subtree yields an empty listing.
    pub(crate) fn record_entries(&self, model: &ModelName) -> Result<Vec<(RecordKey, Oid)>> {
        let Some(head) = &self.head else {
            return Ok(Vec::new());
        };
        let repo = self.inner.repo.read();
        let tree = repo.find_tree(head.tree)?;

        let subtree = match tree.get_name(model.as_str()) {
            Some(entry) if entry.kind() == Some(ObjectType::Tree) => repo.find_tree(entry.id())?,
            _ => return Ok(Vec::new()),
        };

        let mut entries: Vec<(RecordKey, Oid)> = subtree
            .iter()
            .filter_map(|entry| {
                if entry.kind() != Some(ObjectType::Blob) {
                    return None;
                }
                let stem = entry.name()?.strip_suffix(".json")?;
                let key = RecordKey::new(stem).ok()?;
                Some((key, entry.id()))
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }

    /// Blob id of one record, or `None` if it does not exist at this
    /// revision.
    pub(crate) fn record_blob(&self, model: &ModelName, key: &RecordKey) -> Result<Option<Oid>> {
        let Some(head) = &self.head else {
            return Ok(None);
        };
        let repo = self.inner.repo.read();
        let tree = repo.find_tree(head.tree)?;

        let path = RecordPath::new(model.clone(), key.clone()).to_path_buf();
        let entry = match tree.get_path(&path) {
            Ok(entry) if entry.kind() == Some(ObjectType::Blob) => entry,
            _ => return Ok(None),
        };
        Ok(Some(entry.id()))
    }

    /// Read the raw bytes of a blob.
    pub(crate) fn read_blob(&self, blob: Oid) -> Result<Vec<u8>> {
        let repo = self.inner.repo.read();
        let content = repo.find_blob(blob)?.content().to_vec();
        Ok(content)
    }
}
