//! The repository handle.
//!
//! [`GitRepository`] wraps a git working directory and exposes the four
//! engine primitives the store is built on: stage, commit, read-tree, and
//! per-path log. Reads always resolve through [`Snapshot`]s of committed
//! state; the working tree and index are touched only by the staging path.
//!
//! The handle serializes mutations across threads of one process (writers
//! take the internal write lock), but two *processes* mutating the same
//! repository race at the filesystem and index level. Callers that need
//! concurrent-writer safety must serialize externally, e.g. with a single
//! writer process or a lock file keyed by the repository path.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use git2::Repository;
use parking_lot::{Mutex, RwLock};

use crate::error::{Error, Result};
use crate::repo::ignore::{IgnoreList, IGNORE_FILE};
use crate::repo::revision::{commit_timestamp, RevisionId, RevisionInfo};
use crate::repo::snapshot::{Snapshot, SnapshotHead};

/// Author/committer identity used for store commits.
#[derive(Debug, Clone)]
pub struct CommitSignature {
    pub name: String,
    pub email: String,
}

impl CommitSignature {
    /// Create a new signature.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Default identity, independent of any git user configuration.
    pub fn gitrecord() -> Self {
        Self::new("gitrecord", "gitrecord@localhost")
    }

    pub(crate) fn to_git2(&self) -> std::result::Result<git2::Signature<'static>, git2::Error> {
        git2::Signature::now(&self.name, &self.email)
    }
}

impl Default for CommitSignature {
    fn default() -> Self {
        Self::gitrecord()
    }
}

/// Internal state shared via `Arc`.
pub(crate) struct RepoInner {
    pub(crate) repo: RwLock<Repository>,
    pub(crate) workdir: PathBuf,
    pub(crate) ignore: IgnoreList,
    pub(crate) signature: CommitSignature,
    /// Paths staged since the last commit. Lock order: pending before repo.
    pub(crate) pending: Mutex<BTreeSet<PathBuf>>,
}

/// A handle to a git working directory.
///
/// Cheap to clone (`Arc` internally); clones share one repository, one
/// ignore list, and one staging state.
#[derive(Clone)]
pub struct GitRepository {
    pub(crate) inner: Arc<RepoInner>,
}

impl GitRepository {
    /// Open an existing repository at `path`.
    ///
    /// Fails with [`Error::Repository`] when the path is not a git
    /// repository, or when it is bare: the store reads and writes the
    /// working tree, so there must be one. The `.gitrecord_ignore` control
    /// file is loaded once here and stays fixed for the handle's lifetime.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let repo = Repository::open(path).map_err(|e| {
            Error::Repository(format!("{}: {}", path.display(), e.message()))
        })?;

        if repo.is_bare() {
            return Err(Error::Repository(format!(
                "{}: bare repository has no working tree",
                path.display()
            )));
        }
        let workdir = repo
            .workdir()
            .ok_or_else(|| {
                Error::Repository(format!("{}: repository has no working tree", path.display()))
            })?
            .to_path_buf();

        let ignore = IgnoreList::load(&workdir.join(IGNORE_FILE))?;

        Ok(Self {
            inner: Arc::new(RepoInner {
                repo: RwLock::new(repo),
                workdir,
                ignore,
                signature: CommitSignature::gitrecord(),
                pending: Mutex::new(BTreeSet::new()),
            }),
        })
    }

    /// Replace the commit signature. Must be called before the handle is
    /// cloned or shared.
    pub fn with_signature(mut self, signature: CommitSignature) -> Self {
        let inner = Arc::get_mut(&mut self.inner).expect("cannot modify shared repository");
        inner.signature = signature;
        self
    }

    /// Path of the working directory.
    pub fn workdir(&self) -> &Path {
        &self.inner.workdir
    }

    /// True if any ignore-list entry is a prefix of `path`.
    pub fn is_ignored(&self, path: &str) -> bool {
        self.inner.ignore.is_ignored(path)
    }

    /// Execute a function with read access to the repository.
    pub(crate) fn with_repo<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Repository) -> Result<T>,
    {
        let repo = self.inner.repo.read();
        f(&repo)
    }

    /// Execute a function with write access to the repository.
    pub(crate) fn with_repo_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Repository) -> Result<T>,
    {
        let repo = self.inner.repo.write();
        f(&repo)
    }

    // ==================== Staging and committing ====================

    /// Mark repository-relative paths for inclusion in the next revision.
    ///
    /// Existing files are added to the index, missing ones recorded as
    /// removals. At the start of a fresh staging round the index is rebuilt
    /// from HEAD, so unrelated working-tree or index state never leaks into
    /// the next commit.
    pub fn stage<I>(&self, paths: I) -> Result<()>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let paths: Vec<PathBuf> = paths.into_iter().collect();
        let mut pending = self.inner.pending.lock();
        self.with_repo_mut(|repo| {
            if pending.is_empty() {
                reset_index_to_head(repo)?;
            }
            let mut index = repo.index()?;
            for path in &paths {
                if self.inner.workdir.join(path).exists() {
                    index.add_path(path)?;
                } else if index.get_path(path, 0).is_some() {
                    index.remove_path(path)?;
                }
            }
            index.write()?;
            Ok(())
        })?;
        pending.extend(paths);
        Ok(())
    }

    /// Create exactly one revision from the staged paths.
    ///
    /// Fails with [`Error::NothingStaged`] when no paths are pending. If
    /// the engine rejects the commit the index is rolled back to HEAD and
    /// the pending set cleared, so a reported failure never leaves a stale
    /// stage behind.
    pub fn commit(&self, message: &str) -> Result<RevisionId> {
        let mut pending = self.inner.pending.lock();
        if pending.is_empty() {
            return Err(Error::NothingStaged);
        }

        let result = self.with_repo_mut(|repo| {
            let mut index = repo.index()?;
            let tree_id = index.write_tree()?;
            let tree = repo.find_tree(tree_id)?;
            let sig = self.inner.signature.to_git2()?;

            let parent = head_commit(repo)?;
            let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

            let oid = repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
            Ok(RevisionId::new(oid))
        });

        match result {
            Ok(revision) => {
                pending.clear();
                Ok(revision)
            }
            Err(err) => {
                let _ = self.with_repo_mut(|repo| reset_index_to_head(repo));
                pending.clear();
                Err(match err {
                    Error::Git(e) => Error::CommitRejected(e),
                    other => other,
                })
            }
        }
    }

    // ==================== Committed-state reads ====================

    /// The current committed revision; `None` on an unborn branch.
    pub fn head(&self) -> Result<Option<RevisionId>> {
        self.with_repo(|repo| Ok(head_commit(repo)?.map(|c| RevisionId::new(c.id()))))
    }

    /// Snapshot of the committed tree at HEAD.
    pub fn snapshot(&self) -> Result<Snapshot> {
        let head = self.with_repo(|repo| {
            Ok(head_commit(repo)?.map(|commit| SnapshotHead {
                revision: RevisionId::new(commit.id()),
                tree: commit.tree_id(),
                timestamp: commit_timestamp(commit.time()),
            }))
        })?;
        Ok(Snapshot::new(Arc::clone(&self.inner), head))
    }

    /// Snapshot of the committed tree at a specific revision.
    pub fn snapshot_at(&self, revision: RevisionId) -> Result<Snapshot> {
        let head = self.with_repo(|repo| {
            let commit = repo.find_commit(revision.raw())?;
            Ok(SnapshotHead {
                revision,
                tree: commit.tree_id(),
                timestamp: commit_timestamp(commit.time()),
            })
        })?;
        Ok(Snapshot::new(Arc::clone(&self.inner), Some(head)))
    }

    /// All revisions reachable from HEAD, newest first.
    pub fn log(&self) -> Result<Vec<RevisionInfo>> {
        self.with_repo(|repo| {
            if head_commit(repo)?.is_none() {
                return Ok(Vec::new());
            }
            let mut revwalk = repo.revwalk()?;
            revwalk.push_head()?;
            revwalk.set_sorting(git2::Sort::TIME | git2::Sort::TOPOLOGICAL)?;

            let mut revisions = Vec::new();
            for oid in revwalk {
                let commit = repo.find_commit(oid?)?;
                revisions.push(RevisionInfo::from_git2(&commit));
            }
            Ok(revisions)
        })
    }

    /// Revisions that changed the blob at `path`, newest first.
    ///
    /// A revision counts when the blob differs from the first parent:
    /// added, rewritten, or deleted. A path never committed yields an
    /// empty history.
    pub fn history(&self, path: &str) -> Result<Vec<RevisionInfo>> {
        self.with_repo(|repo| {
            if head_commit(repo)?.is_none() {
                return Ok(Vec::new());
            }
            let mut revwalk = repo.revwalk()?;
            revwalk.push_head()?;
            revwalk.set_sorting(git2::Sort::TIME | git2::Sort::TOPOLOGICAL)?;

            let target = Path::new(path);
            let mut touched = Vec::new();
            for oid in revwalk {
                let commit = repo.find_commit(oid?)?;
                let current = entry_oid(&commit.tree()?, target);
                let previous = if commit.parent_count() == 0 {
                    None
                } else {
                    entry_oid(&commit.parent(0)?.tree()?, target)
                };
                if current != previous {
                    touched.push(RevisionInfo::from_git2(&commit));
                }
            }
            Ok(touched)
        })
    }
}

/// HEAD commit, or `None` on an unborn branch.
fn head_commit(repo: &Repository) -> Result<Option<git2::Commit<'_>>> {
    match repo.head() {
        Ok(head) => Ok(Some(head.peel_to_commit()?)),
        Err(e)
            if e.code() == git2::ErrorCode::UnbornBranch
                || e.code() == git2::ErrorCode::NotFound =>
        {
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Rebuild the index from the HEAD tree (or empty it on an unborn branch).
fn reset_index_to_head(repo: &Repository) -> Result<()> {
    let mut index = repo.index()?;
    match head_commit(repo)? {
        Some(commit) => index.read_tree(&commit.tree()?)?,
        None => index.clear()?,
    }
    index.write()?;
    Ok(())
}

fn entry_oid(tree: &git2::Tree<'_>, path: &Path) -> Option<git2::Oid> {
    tree.get_path(path).ok().map(|entry| entry.id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, GitRepository) {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        let repo = GitRepository::open(dir.path()).unwrap();
        (dir, repo)
    }

    fn write_and_commit(repo: &GitRepository, rel: &str, contents: &str, message: &str) -> RevisionId {
        let abs = repo.workdir().join(rel);
        fs::create_dir_all(abs.parent().unwrap()).unwrap();
        fs::write(&abs, contents).unwrap();
        repo.stage([PathBuf::from(rel)]).unwrap();
        repo.commit(message).unwrap()
    }

    #[test]
    fn open_rejects_non_repository() {
        let dir = TempDir::new().unwrap();
        let result = GitRepository::open(dir.path());
        assert!(matches!(result, Err(Error::Repository(_))));
    }

    #[test]
    fn open_rejects_bare_repository() {
        let dir = TempDir::new().unwrap();
        Repository::init_bare(dir.path()).unwrap();
        let result = GitRepository::open(dir.path());
        assert!(matches!(result, Err(Error::Repository(_))));
    }

    #[test]
    fn unborn_branch_is_empty() {
        let (_dir, repo) = setup();
        assert!(repo.head().unwrap().is_none());
        assert!(repo.snapshot().unwrap().is_empty());
        assert!(repo.log().unwrap().is_empty());
        assert!(repo.history("widgets/a.json").unwrap().is_empty());
    }

    #[test]
    fn stage_and_commit_creates_one_revision() {
        let (_dir, repo) = setup();
        let revision = write_and_commit(&repo, "widgets/a.json", "{}", "create widgets/a");

        assert_eq!(repo.head().unwrap(), Some(revision));
        let log = repo.log().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].summary(), "create widgets/a");
        assert_eq!(log[0].author_name, "gitrecord");
    }

    #[test]
    fn commit_without_stage_fails() {
        let (_dir, repo) = setup();
        assert!(matches!(repo.commit("empty"), Err(Error::NothingStaged)));
    }

    #[test]
    fn history_tracks_blob_changes_newest_first() {
        let (_dir, repo) = setup();
        let c1 = write_and_commit(&repo, "widgets/a.json", "{\"n\": 1}", "create widgets/a");
        let c2 = write_and_commit(&repo, "widgets/a.json", "{\"n\": 2}", "update widgets/a");
        // unrelated change does not touch the record
        write_and_commit(&repo, "widgets/b.json", "{}", "create widgets/b");

        fs::remove_file(repo.workdir().join("widgets/a.json")).unwrap();
        repo.stage([PathBuf::from("widgets/a.json")]).unwrap();
        let c4 = repo.commit("delete widgets/a").unwrap();

        let history = repo.history("widgets/a.json").unwrap();
        let ids: Vec<RevisionId> = history.iter().map(|info| info.id).collect();
        assert_eq!(ids, vec![c4, c2, c1]);

        assert!(repo.history("widgets/never.json").unwrap().is_empty());
    }

    #[test]
    fn snapshot_is_pinned_to_its_revision() {
        let (_dir, repo) = setup();
        let c1 = write_and_commit(&repo, "widgets/a.json", "{\"n\": 1}", "create widgets/a");
        let before = repo.snapshot().unwrap();
        write_and_commit(&repo, "widgets/a.json", "{\"n\": 2}", "update widgets/a");

        assert_eq!(before.revision(), Some(c1));
        let pinned = repo.snapshot_at(c1).unwrap();
        assert_eq!(pinned.revision(), Some(c1));
    }

    #[test]
    fn ignore_list_loaded_at_open() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        fs::write(dir.path().join(IGNORE_FILE), "scratch\n").unwrap();

        let repo = GitRepository::open(dir.path()).unwrap();
        assert!(repo.is_ignored("scratch"));
        assert!(repo.is_ignored("scratch/notes.json"));
        assert!(!repo.is_ignored("widgets"));
    }

    #[test]
    fn stale_index_state_does_not_leak_into_commits() {
        let (_dir, repo) = setup();
        write_and_commit(&repo, "widgets/a.json", "{}", "create widgets/a");

        // simulate an external `git add` of an unrelated file
        fs::create_dir_all(repo.workdir().join("stray")).unwrap();
        fs::write(repo.workdir().join("stray/x.json"), "{}").unwrap();
        repo.with_repo_mut(|raw| {
            let mut index = raw.index()?;
            index.add_path(Path::new("stray/x.json"))?;
            index.write()?;
            Ok(())
        })
        .unwrap();

        let revision = write_and_commit(&repo, "widgets/b.json", "{}", "create widgets/b");

        let snapshot = repo.snapshot_at(revision).unwrap();
        let models = snapshot.models().unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].as_str(), "widgets");
    }
}
