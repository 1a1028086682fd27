//! The record store: create, read, update, delete, and history lookup for
//! one model.
//!
//! Every mutating call maps to exactly one commit. The sequence is always
//! the same: check the precondition against the committed tree, write the
//! file atomically (full serialization into a temp file, then rename into
//! place), stage that one path, commit with a deterministic message. Reads
//! resolve against the committed tree only, so a reader never observes an
//! uncommitted intermediate state.
//!
//! Multiple stores for the same model are safe to construct; they share
//! the repository handle and hold no state of their own. Mutations from
//! different processes must be serialized externally (see
//! [`GitRepository`]).

use std::fs;
use std::io::Write;

use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::record::{ModelName, Payload, Record, RecordKey, RecordPath};
use crate::repo::{CommitMessage, GitRepository, RevisionInfo, Snapshot};
use crate::store::query::{RecordCache, Records};

/// Typed access to the records of one model.
#[derive(Clone)]
pub struct RecordStore {
    repo: GitRepository,
    model: ModelName,
}

impl RecordStore {
    pub(crate) fn new(repo: GitRepository, model: ModelName) -> Self {
        Self { repo, model }
    }

    /// The model this store is bound to.
    pub fn model(&self) -> &ModelName {
        &self.model
    }

    // ==================== Mutations ====================

    /// Create a new record.
    ///
    /// Fails with [`Error::DuplicateKey`] if the key already exists in the
    /// committed tree. Commits `create <model>/<key>` and returns the
    /// record as read back from the new revision.
    pub fn create(&self, key: RecordKey, payload: Payload) -> Result<Record> {
        let snapshot = self.repo.snapshot()?;
        if snapshot.record_blob(&self.model, &key)?.is_some() {
            return Err(Error::DuplicateKey {
                model: self.model.clone(),
                key,
            });
        }

        let message = CommitMessage::create(self.model.as_str(), key.as_str());
        self.write_record(Record::from_payload(self.model.clone(), key, payload), &message)
    }

    /// Create a new record under a generated ULID key.
    pub fn insert(&self, payload: Payload) -> Result<Record> {
        self.create(RecordKey::generate(), payload)
    }

    /// Overwrite an existing record's payload.
    ///
    /// Fails with [`Error::NotFound`] if no such record exists. Commits
    /// `update <model>/<key>`.
    pub fn update(&self, key: RecordKey, payload: Payload) -> Result<Record> {
        let snapshot = self.repo.snapshot()?;
        if snapshot.record_blob(&self.model, &key)?.is_none() {
            return Err(Error::NotFound {
                model: self.model.clone(),
                key,
            });
        }

        let message = CommitMessage::update(self.model.as_str(), key.as_str());
        self.write_record(Record::from_payload(self.model.clone(), key, payload), &message)
    }

    /// Remove a record.
    ///
    /// Fails with [`Error::NotFound`] if no such record exists. Commits
    /// `delete <model>/<key>`.
    pub fn delete(&self, key: &RecordKey) -> Result<()> {
        let snapshot = self.repo.snapshot()?;
        if snapshot.record_blob(&self.model, key)?.is_none() {
            return Err(Error::NotFound {
                model: self.model.clone(),
                key: key.clone(),
            });
        }

        let path = RecordPath::new(self.model.clone(), key.clone());
        let absolute = self.repo.workdir().join(path.to_path_buf());
        if absolute.exists() {
            fs::remove_file(&absolute)?;
        }
        self.repo.stage([path.to_path_buf()])?;
        self.repo
            .commit(&CommitMessage::delete(self.model.as_str(), key.as_str()))?;
        Ok(())
    }

    /// Serialize to a temp file, move into place, stage, commit, re-read.
    fn write_record(&self, record: Record, message: &str) -> Result<Record> {
        let path = RecordPath::new(self.model.clone(), record.key().clone());
        let directory = self.repo.workdir().join(self.model.as_str());
        fs::create_dir_all(&directory)?;

        let bytes = record.to_bytes()?;
        let mut staging = NamedTempFile::new_in(&directory)?;
        staging.write_all(&bytes)?;
        staging
            .persist(self.repo.workdir().join(path.to_path_buf()))
            .map_err(|e| Error::Io(e.error))?;

        self.repo.stage([path.to_path_buf()])?;
        self.repo.commit(message)?;

        self.get(record.key())
    }

    // ==================== Committed-state reads ====================

    /// Read a record from the current committed tree.
    ///
    /// Fails with [`Error::NotFound`] if the key does not exist, and with
    /// [`Error::CorruptRecord`] if the file cannot be decoded.
    pub fn get(&self, key: &RecordKey) -> Result<Record> {
        let snapshot = self.repo.snapshot()?;
        self.get_at(&snapshot, key)
    }

    fn get_at(&self, snapshot: &Snapshot, key: &RecordKey) -> Result<Record> {
        let blob = snapshot
            .record_blob(&self.model, key)?
            .ok_or_else(|| Error::NotFound {
                model: self.model.clone(),
                key: key.clone(),
            })?;
        let bytes = snapshot.read_blob(blob)?;
        let record = Record::from_bytes(self.model.clone(), key.clone(), &bytes).map_err(|err| {
            Error::CorruptRecord {
                path: RecordPath::new(self.model.clone(), key.clone()).to_string(),
                reason: err.to_string(),
            }
        })?;
        Ok(match snapshot.timestamp() {
            Some(updated_at) => record.with_metadata(blob.to_string(), updated_at),
            None => record,
        })
    }

    /// Scan all committed records of the model, filtered by a predicate.
    ///
    /// Lazy and single-pass, in lexicographic key order. Undecodable
    /// entries are skipped with a warning rather than failing the scan.
    pub fn find<P>(&self, predicate: P) -> Result<Records<P>>
    where
        P: FnMut(&Record) -> bool,
    {
        let snapshot = self.repo.snapshot()?;
        Records::new(snapshot, self.model.clone(), predicate)
    }

    /// All committed records of the model, in lexicographic key order.
    pub fn all(&self) -> Result<Vec<Record>> {
        self.find(|_| true)?.collect()
    }

    // ==================== History ====================

    /// Revisions that touched this record's file, newest first.
    ///
    /// Includes the deleting revision for a removed record. A key never
    /// committed yields an empty history.
    pub fn history(&self, key: &RecordKey) -> Result<Vec<RevisionInfo>> {
        let path = RecordPath::new(self.model.clone(), key.clone());
        self.repo.history(&path.to_string())
    }

    /// Every committed state of a record, newest first.
    ///
    /// Each returned record carries the version and timestamp of the
    /// revision that produced it. Deleting revisions contribute no state;
    /// unparsable historical states are skipped with a warning.
    pub fn versions(&self, key: &RecordKey) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        for info in self.history(key)? {
            let snapshot = self.repo.snapshot_at(info.id)?;
            let Some(blob) = snapshot.record_blob(&self.model, key)? else {
                continue;
            };
            let bytes = snapshot.read_blob(blob)?;
            match Record::from_bytes(self.model.clone(), key.clone(), &bytes) {
                Ok(record) => {
                    records.push(record.with_metadata(blob.to_string(), info.timestamp))
                }
                Err(err) => {
                    log::warn!(
                        "skipping unreadable state of {}/{}.json at {}: {}",
                        self.model,
                        key,
                        info.id.short(),
                        err
                    );
                }
            }
        }
        Ok(records)
    }

    /// The committed state of a record whose blob id matches `version`.
    ///
    /// Fails with [`Error::NotFound`] when no revision of the record ever
    /// carried that version.
    pub fn get_version(&self, key: &RecordKey, version: &str) -> Result<Record> {
        for info in self.history(key)? {
            let snapshot = self.repo.snapshot_at(info.id)?;
            let Some(blob) = snapshot.record_blob(&self.model, key)? else {
                continue;
            };
            if blob.to_string() != version {
                continue;
            }
            let bytes = snapshot.read_blob(blob)?;
            let record = Record::from_bytes(self.model.clone(), key.clone(), &bytes).map_err(
                |err| Error::CorruptRecord {
                    path: RecordPath::new(self.model.clone(), key.clone()).to_string(),
                    reason: err.to_string(),
                },
            )?;
            return Ok(record.with_metadata(blob.to_string(), info.timestamp));
        }
        Err(Error::NotFound {
            model: self.model.clone(),
            key: key.clone(),
        })
    }

    /// Build an in-memory cache of every committed state of the model.
    ///
    /// Walks the full history once, newest first; the first (most recent)
    /// occurrence of each `(key, version)` state wins. A record that is
    /// unreadable at HEAD is a hard error; unreadable historical states
    /// are skipped with a warning.
    pub fn build_cache(&self) -> Result<RecordCache> {
        let mut cache = RecordCache::default();
        let mut at_head = true;

        for info in self.repo.log()? {
            let snapshot = self.repo.snapshot_at(info.id)?;
            for (key, blob) in snapshot.record_entries(&self.model)? {
                let version = blob.to_string();
                if at_head {
                    cache.set_head(&key, &version);
                }
                if cache.contains(&key, &version) {
                    continue;
                }
                let bytes = snapshot.read_blob(blob)?;
                match Record::from_bytes(self.model.clone(), key.clone(), &bytes) {
                    Ok(record) => {
                        let record = record.with_metadata(version.clone(), info.timestamp);
                        cache.insert(&key, &version, record);
                    }
                    Err(err) if at_head => {
                        return Err(Error::CorruptRecord {
                            path: RecordPath::new(self.model.clone(), key.clone()).to_string(),
                            reason: err.to_string(),
                        });
                    }
                    Err(err) => {
                        log::warn!(
                            "skipping unreadable state of {}/{}.json at {}: {}",
                            self.model,
                            key,
                            info.id.short(),
                            err
                        );
                    }
                }
            }
            at_head = false;
        }
        Ok(cache)
    }
}
