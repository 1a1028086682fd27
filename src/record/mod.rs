//! The record abstraction: validated names and the document type.
//!
//! A [`Record`] is one JSON document belonging to exactly one model. The
//! name newtypes guarantee that model names and record keys are safe to use
//! as path components of the working tree.

mod record;
mod types;

pub use record::{payload_from, Payload, Record};
pub use types::{InvalidNameError, ModelName, RecordKey, RecordPath};
