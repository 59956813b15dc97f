//! Prefix reindexing after a folder rename.

use std::sync::Arc;

use tracing::{debug, info};

use relabel_core::{MetadataRecord, PartialRename};

use crate::{MetadataStore, StoreError, StoreResult};

/// Rewrites the stored path prefix of every record nested under a folder.
#[derive(Clone)]
pub struct MetadataReindexer {
    store: Arc<dyn MetadataStore>,
    separator: char,
}

impl std::fmt::Debug for MetadataReindexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataReindexer")
            .field("separator", &self.separator)
            .finish_non_exhaustive()
    }
}

impl MetadataReindexer {
    pub fn new(store: Arc<dyn MetadataStore>, separator: char) -> Self {
        Self { store, separator }
    }

    /// Move every record under `old_prefix` to `new_prefix`.
    ///
    /// Both prefixes are treated as folder paths: a missing trailing
    /// separator is added, so renaming `foo` never touches `foobar`.
    /// Returns the number of records rewritten; zero is not an error.
    pub fn reindex(&self, old_prefix: &str, new_prefix: &str) -> StoreResult<usize> {
        let old_prefix = self.anchor(old_prefix);
        let new_prefix = self.anchor(new_prefix);

        if old_prefix == new_prefix {
            return Ok(0);
        }
        if old_prefix.len() == self.separator.len_utf8() {
            return Err(StoreError::backend("refusing to rewrite the root prefix"));
        }

        debug!(old = %old_prefix, new = %new_prefix, "rewriting record prefixes");
        let count = self.store.bulk_rewrite_prefix(&old_prefix, &new_prefix)?;
        info!(old = %old_prefix, new = %new_prefix, count, "records reindexed");
        Ok(count)
    }

    /// Records still stored under `prefix`.
    ///
    /// After a successful reindex this is empty for the old prefix.
    pub fn stale_records(&self, prefix: &str) -> StoreResult<Vec<MetadataRecord>> {
        self.store.find_by_path_prefix(&self.anchor(prefix))
    }

    /// Finish a folder rename whose records were left behind.
    pub fn repair(&self, partial: &PartialRename) -> StoreResult<usize> {
        self.reindex(&partial.old_prefix, &partial.new_prefix)
    }

    fn anchor(&self, prefix: &str) -> String {
        if prefix.ends_with(self.separator) {
            prefix.to_string()
        } else {
            format!("{prefix}{}", self.separator)
        }
    }
}
