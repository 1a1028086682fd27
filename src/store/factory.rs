//! The record factory: entry point and model registry.

use std::path::Path;

use crate::error::{Error, Result};
use crate::record::ModelName;
use crate::repo::{GitRepository, RevisionId};
use crate::store::store::RecordStore;

/// The sole entry point of the store.
///
/// Opens a repository handle and hands out [`RecordStore`]s bound to named
/// models. Every store obtained from one factory shares the same handle,
/// ignore list, and commit identity.
pub struct RecordFactory {
    repo: GitRepository,
}

impl RecordFactory {
    /// Open the store over the git working directory at `path`.
    ///
    /// Fails with [`Error::Repository`] when the path is not a git working
    /// directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            repo: GitRepository::open(path)?,
        })
    }

    /// Wrap an already-opened repository handle.
    pub fn with_repository(repo: GitRepository) -> Self {
        Self { repo }
    }

    /// The underlying repository handle.
    pub fn repository(&self) -> &GitRepository {
        &self.repo
    }

    /// Names of all models in the committed tree, lexicographically sorted.
    ///
    /// One entry per top-level subtree that is not excluded by the ignore
    /// list.
    pub fn models(&self) -> Result<Vec<ModelName>> {
        let models = self.repo.snapshot()?.models()?;
        Ok(models
            .into_iter()
            .filter(|model| !self.repo.is_ignored(model.as_str()))
            .collect())
    }

    /// A record store bound to the named model.
    ///
    /// Fails with [`Error::UnknownModel`] when the name is excluded by the
    /// ignore list: the one class of names a caller may never create.
    /// Any other valid name yields a usable store: a model with no backing
    /// subtree yet is registered implicitly by its first committed create,
    /// and until then reads behave as an empty model.
    pub fn model(&self, name: impl Into<String>) -> Result<RecordStore> {
        let model = ModelName::new(name)?;
        if self.repo.is_ignored(model.as_str()) {
            return Err(Error::UnknownModel(model));
        }
        Ok(RecordStore::new(self.repo.clone(), model))
    }

    /// The current committed revision; `None` before the first commit.
    pub fn head(&self) -> Result<Option<RevisionId>> {
        self.repo.head()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{payload_from, RecordKey};
    use serde_json::json;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn setup() -> (TempDir, RecordFactory) {
        let dir = TempDir::new().unwrap();
        git2::Repository::init(dir.path()).unwrap();
        let factory = RecordFactory::open(dir.path()).unwrap();
        (dir, factory)
    }

    fn key(s: &str) -> RecordKey {
        RecordKey::new(s).unwrap()
    }

    #[test]
    fn open_requires_a_repository() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            RecordFactory::open(dir.path()),
            Err(Error::Repository(_))
        ));
    }

    #[test]
    fn empty_repository_has_no_models() {
        let (_dir, factory) = setup();
        assert!(factory.models().unwrap().is_empty());
        assert!(factory.head().unwrap().is_none());
    }

    #[test]
    fn first_create_registers_the_model() {
        let (_dir, factory) = setup();
        let widgets = factory.model("widgets").unwrap();

        widgets
            .create(key("a"), payload_from(json!({"n": 1})).unwrap())
            .unwrap();

        let models = factory.models().unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].as_str(), "widgets");
        assert!(factory.head().unwrap().is_some());
    }

    #[test]
    fn models_are_sorted_and_ignore_filtered() {
        let dir = TempDir::new().unwrap();
        git2::Repository::init(dir.path()).unwrap();
        fs::write(dir.path().join(".gitrecord_ignore"), "scratch\n").unwrap();
        let factory = RecordFactory::open(dir.path()).unwrap();

        for model in ["plans", "widgets", "catalogs"] {
            factory
                .model(model)
                .unwrap()
                .create(key("one"), payload_from(json!({})).unwrap())
                .unwrap();
        }

        // an ignored subtree, committed behind the registry's back
        let repo = factory.repository();
        fs::create_dir_all(repo.workdir().join("scratch")).unwrap();
        fs::write(repo.workdir().join("scratch/x.json"), "{}").unwrap();
        repo.stage([PathBuf::from("scratch/x.json")]).unwrap();
        repo.commit("add scratch").unwrap();

        let models = factory.models().unwrap();
        let names: Vec<&str> = models.iter().map(|m| m.as_str()).collect();
        assert_eq!(names, vec!["catalogs", "plans", "widgets"]);
    }

    #[test]
    fn ignored_model_is_unfetchable() {
        let dir = TempDir::new().unwrap();
        git2::Repository::init(dir.path()).unwrap();
        fs::write(dir.path().join(".gitrecord_ignore"), "scratch\n").unwrap();
        let factory = RecordFactory::open(dir.path()).unwrap();

        assert!(matches!(
            factory.model("scratch"),
            Err(Error::UnknownModel(_))
        ));
    }

    #[test]
    fn invalid_model_name_is_rejected() {
        let (_dir, factory) = setup();
        assert!(matches!(
            factory.model("no/slashes"),
            Err(Error::InvalidName(_))
        ));
    }

    #[test]
    fn stores_share_committed_state() {
        let (_dir, factory) = setup();
        let writer = factory.model("widgets").unwrap();
        let reader = factory.model("widgets").unwrap();

        writer
            .create(key("a"), payload_from(json!({"n": 1})).unwrap())
            .unwrap();

        let seen = reader.get(&key("a")).unwrap();
        assert_eq!(seen.get("n"), Some(&json!(1)));
    }
}
