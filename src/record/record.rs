//! The record type: one structured JSON document inside a model.
//!
//! On disk a record is nothing but its payload object, pretty-printed as
//! UTF-8 JSON. Identity and version metadata are derived at load time from
//! the repository itself: the key from the filename stem, the version from
//! the blob id of the committed content, and the update time from the
//! commit the record was read at. None of that is embedded in the file.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::record::types::{ModelName, RecordKey};

/// A record payload: string keys mapped to JSON values.
///
/// `BTreeMap` keeps on-disk key order deterministic, which matters for git
/// deduplication (identical payloads hash to identical blobs).
pub type Payload = BTreeMap<String, Value>;

/// Convert a JSON value into a [`Payload`].
///
/// Fails with [`Error::NotAnObject`] unless the value is a JSON object.
pub fn payload_from(value: Value) -> Result<Payload> {
    match value {
        Value::Object(map) => Ok(map.into_iter().collect()),
        _ => Err(Error::NotAnObject),
    }
}

/// One structured document, uniquely keyed within its model.
///
/// Records returned by the store carry `version` and `updated_at` metadata
/// resolved from the committed tree; records built by the caller do not.
/// Equality compares model, key, and payload only: metadata is excluded,
/// since two reads of the same committed content are the same record.
#[derive(Debug, Clone)]
pub struct Record {
    model: ModelName,
    key: RecordKey,
    payload: Payload,
    version: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

impl Record {
    /// Build a record from its parts. No metadata is attached.
    pub fn from_payload(model: ModelName, key: RecordKey, payload: Payload) -> Self {
        Self {
            model,
            key,
            payload,
            version: None,
            updated_at: None,
        }
    }

    /// Build a record from a JSON value, which must be an object.
    pub fn from_value(model: ModelName, key: RecordKey, value: Value) -> Result<Self> {
        Ok(Self::from_payload(model, key, payload_from(value)?))
    }

    /// Decode a record from its on-disk bytes.
    pub fn from_bytes(model: ModelName, key: RecordKey, bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(model, key, value)
    }

    /// Serialize the payload to its on-disk representation.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(&self.payload)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// The payload as a JSON object value.
    pub fn to_payload(&self) -> Value {
        Value::Object(self.payload.clone().into_iter().collect())
    }

    /// The model this record belongs to. Fixed at creation.
    pub fn model(&self) -> &ModelName {
        &self.model
    }

    /// The record key. Immutable once constructed.
    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    /// The payload mapping.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Get a payload field by name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.payload.get(field)
    }

    /// Blob id of the committed content this record was read from, if any.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Timestamp of the commit this record was read at, if any.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Attach read-side metadata resolved from the committed tree.
    pub(crate) fn with_metadata(mut self, version: String, updated_at: DateTime<Utc>) -> Self {
        self.version = Some(version);
        self.updated_at = Some(updated_at);
        self
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.model == other.model && self.key == other.key && self.payload == other.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn widgets() -> ModelName {
        ModelName::new("widgets").unwrap()
    }

    fn key(s: &str) -> RecordKey {
        RecordKey::new(s).unwrap()
    }

    #[test]
    fn from_value_requires_object() {
        assert!(Record::from_value(widgets(), key("a"), json!({"n": 1})).is_ok());
        assert!(matches!(
            Record::from_value(widgets(), key("a"), json!([1, 2])),
            Err(Error::NotAnObject)
        ));
        assert!(matches!(
            Record::from_value(widgets(), key("a"), json!("text")),
            Err(Error::NotAnObject)
        ));
    }

    #[test]
    fn payload_round_trip() {
        let record = Record::from_value(
            widgets(),
            key("a"),
            json!({"name": "Alice", "count": 42, "tags": ["x", "y"], "nested": {"ok": true}}),
        )
        .unwrap();

        let bytes = record.to_bytes().unwrap();
        let restored = Record::from_bytes(widgets(), key("a"), &bytes).unwrap();

        assert_eq!(record, restored);
        assert_eq!(record.to_payload(), restored.to_payload());
    }

    #[test]
    fn round_trip_law() {
        let payload = payload_from(json!({"b": 2, "a": 1})).unwrap();
        let record = Record::from_payload(widgets(), key("r"), payload);
        let rebuilt =
            Record::from_value(widgets(), key("r"), record.to_payload()).unwrap();
        assert_eq!(rebuilt.to_payload(), record.to_payload());
    }

    #[test]
    fn metadata_excluded_from_equality() {
        let bare = Record::from_value(widgets(), key("a"), json!({"n": 1})).unwrap();
        let loaded = bare
            .clone()
            .with_metadata("abc123".to_string(), Utc::now());

        assert_eq!(bare, loaded);
        assert_eq!(loaded.version(), Some("abc123"));
        assert!(bare.version().is_none());
    }

    #[test]
    fn disk_format_is_payload_only() {
        let record = Record::from_value(widgets(), key("a"), json!({"n": 1})).unwrap();
        let parsed: Value = serde_json::from_slice(&record.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, json!({"n": 1}));
    }
}
