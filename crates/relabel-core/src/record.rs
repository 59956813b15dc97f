//! Metadata records tracked by the secondary index.

use serde::{Deserialize, Serialize};

/// Identifier of a metadata record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl RecordId {
    #[inline]
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A tracked reference to a file's storage path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub id: RecordId,
    /// Full storage path of the file.
    pub stored_path: String,
    /// Logical filename shown to users.
    pub filename: String,
}

impl MetadataRecord {
    /// Create a record whose filename is the last segment of `stored_path`.
    pub fn new(id: RecordId, stored_path: impl Into<String>, separator: char) -> Self {
        let stored_path = stored_path.into();
        let filename = stored_path
            .rsplit(separator)
            .next()
            .unwrap_or_default()
            .to_string();
        Self {
            id,
            stored_path,
            filename,
        }
    }

    /// Set the logical filename.
    pub fn set_filename(&mut self, filename: impl Into<String>) {
        self.filename = filename.into();
    }

    /// Point the record at a new storage path and filename.
    pub fn relocate(&mut self, stored_path: impl Into<String>, filename: impl Into<String>) {
        self.stored_path = stored_path.into();
        self.set_filename(filename);
    }

    /// Check whether the stored path lies under `prefix` (anchored, case-sensitive).
    pub fn is_under(&self, prefix: &str) -> bool {
        self.stored_path.starts_with(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_derives_filename() {
        let record = MetadataRecord::new(RecordId::new(1), "/a/b/report.pdf", '/');
        assert_eq!(record.filename, "report.pdf");
    }

    #[test]
    fn test_relocate() {
        let mut record = MetadataRecord::new(RecordId::new(1), "/a/old.txt", '/');
        record.relocate("/a/new.txt", "new.txt");
        assert_eq!(record.stored_path, "/a/new.txt");
        assert_eq!(record.filename, "new.txt");
        assert!(record.is_under("/a/"));
        assert!(!record.is_under("/A/"));
    }
}
