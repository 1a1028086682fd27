//! Predicate scans over a model's committed records.

use std::collections::{BTreeMap, HashMap};

use git2::Oid;

use crate::error::Result;
use crate::record::{ModelName, Record, RecordKey};
use crate::repo::Snapshot;

/// Lazy iterator over the records of one model at one snapshot.
///
/// Entries are visited in lexicographic key order. Each step reads and
/// decodes a single blob; entries that fail to decode are skipped with a
/// warning-level diagnostic so one corrupt file cannot make the whole
/// model unreadable. Single-pass: re-invoke `find` to rescan.
pub struct Records<P> {
    snapshot: Snapshot,
    model: ModelName,
    entries: std::vec::IntoIter<(RecordKey, Oid)>,
    predicate: P,
}

impl<P> Records<P>
where
    P: FnMut(&Record) -> bool,
{
    pub(crate) fn new(snapshot: Snapshot, model: ModelName, predicate: P) -> Result<Self> {
        let entries = snapshot.record_entries(&model)?;
        Ok(Self {
            snapshot,
            model,
            entries: entries.into_iter(),
            predicate,
        })
    }
}

impl<P> Iterator for Records<P>
where
    P: FnMut(&Record) -> bool,
{
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (key, blob) = self.entries.next()?;
            let bytes = match self.snapshot.read_blob(blob) {
                Ok(bytes) => bytes,
                Err(err) => return Some(Err(err)),
            };
            let record = match Record::from_bytes(self.model.clone(), key.clone(), &bytes) {
                Ok(record) => record,
                Err(err) => {
                    log::warn!("skipping unreadable record {}/{}.json: {}", self.model, key, err);
                    continue;
                }
            };
            let record = match self.snapshot.timestamp() {
                Some(updated_at) => record.with_metadata(blob.to_string(), updated_at),
                None => record,
            };
            if (self.predicate)(&record) {
                return Some(Ok(record));
            }
        }
    }
}

/// An in-memory cache of every committed state of a model.
///
/// Built by one pass over the repository history. States are keyed by
/// `(record key, version)`; the head map resolves each currently-live key
/// to its version at HEAD.
#[derive(Debug, Default)]
pub struct RecordCache {
    by_version: HashMap<(String, String), Record>,
    head: BTreeMap<String, String>,
}

impl RecordCache {
    pub(crate) fn insert(&mut self, key: &RecordKey, version: &str, record: Record) {
        self.by_version
            .insert((key.as_str().to_string(), version.to_string()), record);
    }

    pub(crate) fn contains(&self, key: &RecordKey, version: &str) -> bool {
        self.by_version
            .contains_key(&(key.as_str().to_string(), version.to_string()))
    }

    pub(crate) fn set_head(&mut self, key: &RecordKey, version: &str) {
        self.head
            .insert(key.as_str().to_string(), version.to_string());
    }

    /// Look up one committed state by key and version.
    pub fn get(&self, key: &str, version: &str) -> Option<&Record> {
        self.by_version
            .get(&(key.to_string(), version.to_string()))
    }

    /// Version of a record at HEAD, if it is currently live.
    pub fn head_version(&self, key: &str) -> Option<&str> {
        self.head.get(key).map(String::as_str)
    }

    /// Record state at HEAD, if the key is currently live.
    pub fn head_record(&self, key: &str) -> Option<&Record> {
        let version = self.head.get(key)?;
        self.by_version.get(&(key.to_string(), version.clone()))
    }

    /// Keys live at HEAD, in lexicographic order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.head.keys().map(String::as_str)
    }

    /// Number of cached `(key, version)` states.
    pub fn len(&self) -> usize {
        self.by_version.len()
    }

    /// True if nothing was cached.
    pub fn is_empty(&self) -> bool {
        self.by_version.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ModelName;
    use serde_json::json;

    #[test]
    fn cache_lookup() {
        let model = ModelName::new("widgets").unwrap();
        let key = RecordKey::new("a").unwrap();
        let record = Record::from_value(model, key.clone(), json!({"n": 1})).unwrap();

        let mut cache = RecordCache::default();
        cache.insert(&key, "v1", record.clone());
        cache.set_head(&key, "v1");

        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&key, "v1"));
        assert_eq!(cache.get("a", "v1"), Some(&record));
        assert_eq!(cache.head_version("a"), Some("v1"));
        assert_eq!(cache.head_record("a"), Some(&record));
        assert!(cache.get("a", "v2").is_none());
        assert!(cache.head_version("b").is_none());
        assert_eq!(cache.keys().collect::<Vec<_>>(), vec!["a"]);
    }
}
