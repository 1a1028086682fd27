//! gitrecord - a Git-backed versioned record store.
//!
//! A lightweight document store layered on a git working directory. Named
//! models map to top-level directories, each record is one JSON file, and
//! every create/update/delete is captured as exactly one commit. History,
//! durability, and auditability come from git itself, with no database
//! server to run. Designed for small, low-write-volume structured data
//! (configuration records, small catalogs) where the history *is* the
//! point.
//!
//! # Example
//!
//! ```no_run
//! use gitrecord::{payload_from, RecordFactory, RecordKey};
//! use serde_json::json;
//!
//! let factory = RecordFactory::open("./config-repo").unwrap();
//! let widgets = factory.model("widgets").unwrap();
//!
//! // every mutation is one commit
//! let record = widgets
//!     .create(
//!         RecordKey::new("primary").unwrap(),
//!         payload_from(json!({"size": 3})).unwrap(),
//!     )
//!     .unwrap();
//!
//! // reads resolve against the committed tree
//! let fetched = widgets.get(record.key()).unwrap();
//! assert_eq!(fetched.get("size"), Some(&json!(3)));
//!
//! // the full audit trail, newest first
//! for revision in widgets.history(record.key()).unwrap() {
//!     println!("{} {}", revision.id.short(), revision.summary());
//! }
//! ```
//!
//! # Concurrency
//!
//! One process, many threads: safe; the handle serializes mutations
//! internally. Many processes are not protected; callers must serialize
//! writers externally (single writer process, lock file, or similar).

pub mod error;
pub mod record;
pub mod repo;
pub mod store;

pub use error::{Error, Result};
pub use record::{payload_from, InvalidNameError, ModelName, Payload, Record, RecordKey, RecordPath};
pub use repo::{
    CommitMessage, CommitSignature, GitRepository, IgnoreList, RevisionId, RevisionInfo, Snapshot,
    IGNORE_FILE,
};
pub use store::{RecordCache, RecordFactory, RecordStore, Records};
