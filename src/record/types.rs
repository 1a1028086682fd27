//! Validated name types for models and record keys.
//!
//! Model names and record keys become directory and file names inside the
//! working tree, so both are restricted to a filesystem-safe character set.
//! Validation happens once at construction; everything downstream can treat
//! the wrapped string as safe to join into a path.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A validated model name.
///
/// A model maps 1:1 to a top-level directory of the repository, so names
/// are restricted:
/// - 1-64 characters
/// - ASCII alphanumeric, underscores, hyphens only
/// - must start with a letter, digit, or underscore
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelName(String);

impl ModelName {
    /// Create a new ModelName, validating the input.
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidNameError> {
        let name = name.into();
        validate(&name, 64)?;
        Ok(Self(name))
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to an owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ModelName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A validated record key.
///
/// Keys are used as filename stems (`<key>.json`), so they carry the same
/// restrictions as model names but may be longer (up to 128 characters) and
/// may start with any allowed character. Keys are often auto generated
/// (ULIDs) via [`RecordKey::generate`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey(String);

impl RecordKey {
    /// Create a new RecordKey, validating the input.
    pub fn new(key: impl Into<String>) -> Result<Self, InvalidNameError> {
        let key = key.into();
        if key.is_empty() {
            return Err(InvalidNameError::Empty);
        }
        if key.len() > 128 {
            return Err(InvalidNameError::TooLong(key.len()));
        }
        for (i, c) in key.chars().enumerate() {
            if !c.is_ascii_alphanumeric() && c != '_' && c != '-' {
                return Err(InvalidNameError::InvalidCharacter { char: c, position: i });
            }
        }
        Ok(Self(key))
    }

    /// Generate a new ULID-based record key.
    pub fn generate() -> Self {
        Self(ulid::Ulid::new().to_string().to_lowercase())
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to an owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for RecordKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn validate(name: &str, max_len: usize) -> Result<(), InvalidNameError> {
    if name.is_empty() {
        return Err(InvalidNameError::Empty);
    }
    if name.len() > max_len {
        return Err(InvalidNameError::TooLong(name.len()));
    }
    let first = name.chars().next().unwrap();
    if !first.is_ascii_alphanumeric() && first != '_' {
        return Err(InvalidNameError::InvalidStart(first));
    }
    for (i, c) in name.chars().enumerate() {
        if !c.is_ascii_alphanumeric() && c != '_' && c != '-' {
            return Err(InvalidNameError::InvalidCharacter { char: c, position: i });
        }
    }
    Ok(())
}

/// Repository-relative path of a record.
///
/// Format: `{model}/{key}.json`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPath {
    pub model: ModelName,
    pub key: RecordKey,
}

impl RecordPath {
    /// Create a new RecordPath.
    pub fn new(model: ModelName, key: RecordKey) -> Self {
        Self { model, key }
    }

    /// Convert to a PathBuf for filesystem operations.
    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(format!("{}/{}.json", self.model, self.key))
    }
}

impl fmt::Display for RecordPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}.json", self.model, self.key)
    }
}

/// Error type for invalid model names and record keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidNameError {
    Empty,
    TooLong(usize),
    InvalidStart(char),
    InvalidCharacter { char: char, position: usize },
}

impl fmt::Display for InvalidNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "name cannot be empty"),
            Self::TooLong(len) => write!(f, "name too long: {} characters", len),
            Self::InvalidStart(c) => write!(f, "name cannot start with '{}'", c),
            Self::InvalidCharacter { char, position } => {
                write!(f, "invalid character '{}' at position {}", char, position)
            }
        }
    }
}

impl std::error::Error for InvalidNameError {}
