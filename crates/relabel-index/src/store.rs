//! The metadata store interface.

use relabel_core::MetadataRecord;

use crate::StoreResult;

/// Query and update access to the metadata index.
///
/// Implementations must be safe to share between threads; the rename
/// engine holds one behind an `Arc`.
pub trait MetadataStore: Send + Sync {
    /// Find the record whose stored path equals `path`.
    fn find_by_path(&self, path: &str) -> StoreResult<Option<MetadataRecord>>;

    /// Find every record whose stored path starts with `prefix`.
    ///
    /// Matching is anchored and case-sensitive; no character of `prefix`
    /// acts as a wildcard.
    fn find_by_path_prefix(&self, prefix: &str) -> StoreResult<Vec<MetadataRecord>>;

    /// Replace `old_prefix` with `new_prefix` on every matching record.
    ///
    /// The rewrite is all-or-nothing: on error no record has changed.
    /// Returns the number of records rewritten.
    fn bulk_rewrite_prefix(&self, old_prefix: &str, new_prefix: &str) -> StoreResult<usize>;

    /// Create and persist a record for `path`.
    fn create_record(&self, path: &str) -> StoreResult<MetadataRecord>;

    /// Persist changes to an existing record.
    fn save(&self, record: &MetadataRecord) -> StoreResult<()>;

    /// Every record, ordered by id.
    fn all(&self) -> StoreResult<Vec<MetadataRecord>>;
}
