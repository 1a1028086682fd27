//! The `.gitrecord_ignore` control file.
//!
//! A flat list of path prefixes, one per line, read once from the
//! repository root when the handle is opened. A subtree whose path starts
//! with any listed prefix is invisible to model discovery and can never be
//! fetched as a model. Blank lines and `#` comments are skipped.

use std::fs;
use std::path::Path;

use crate::error::Result;

/// Name of the control file at the repository root.
pub const IGNORE_FILE: &str = ".gitrecord_ignore";

/// The parsed ignore list. Immutable for the lifetime of its handle.
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    prefixes: Vec<String>,
}

impl IgnoreList {
    /// Load the ignore list from a file. A missing file yields an empty
    /// list; an unreadable one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    /// Parse ignore entries from newline-separated text.
    pub fn parse(text: &str) -> Self {
        let prefixes = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();
        Self { prefixes }
    }

    /// True if any entry is a prefix of `path`.
    pub fn is_ignored(&self, path: &str) -> bool {
        self.prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    /// True if no entries were loaded.
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_blanks_and_comments() {
        let list = IgnoreList::parse("# internal areas\n\nscratch\n  archive  \n");
        assert_eq!(list.len(), 2);
        assert!(list.is_ignored("scratch"));
        assert!(list.is_ignored("archive"));
        assert!(!list.is_ignored("widgets"));
    }

    #[test]
    fn prefix_matching() {
        let list = IgnoreList::parse("scratch\n");
        assert!(list.is_ignored("scratch"));
        assert!(list.is_ignored("scratch/notes.json"));
        assert!(list.is_ignored("scratchpad")); // plain prefix match
        assert!(!list.is_ignored("my_scratch"));
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let list = IgnoreList::load(&dir.path().join(IGNORE_FILE)).unwrap();
        assert!(list.is_empty());
        assert!(!list.is_ignored("anything"));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(IGNORE_FILE);
        std::fs::write(&path, "ignored_model\n# comment\n").unwrap();

        let list = IgnoreList::load(&path).unwrap();
        assert_eq!(list.len(), 1);
        assert!(list.is_ignored("ignored_model"));
    }
}
