//! In-memory metadata store.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use relabel_core::{MetadataRecord, RecordId};

use crate::{MetadataStore, StoreError, StoreResult};

/// A metadata store kept entirely in memory.
///
/// Every mutation takes the single write lock, so a prefix rewrite is
/// observed by readers either entirely or not at all.
#[derive(Debug)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<RecordId, MetadataRecord>>,
    next_id: AtomicU64,
    separator: char,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new('/')
    }
}

impl MemoryStore {
    /// Create an empty store for paths using `separator`.
    pub fn new(separator: char) -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            separator,
        }
    }

    /// Create a store pre-populated with one record per path.
    pub fn with_paths<I, S>(paths: I) -> StoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let store = Self::default();
        for path in paths {
            store.create_record(path.as_ref())?;
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, BTreeMap<RecordId, MetadataRecord>>> {
        self.records.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, BTreeMap<RecordId, MetadataRecord>>> {
        self.records.write().map_err(|_| StoreError::Poisoned)
    }
}

impl MetadataStore for MemoryStore {
    fn find_by_path(&self, path: &str) -> StoreResult<Option<MetadataRecord>> {
        Ok(self
            .read()?
            .values()
            .find(|r| r.stored_path == path)
            .cloned())
    }

    fn find_by_path_prefix(&self, prefix: &str) -> StoreResult<Vec<MetadataRecord>> {
        Ok(self
            .read()?
            .values()
            .filter(|r| r.is_under(prefix))
            .cloned()
            .collect())
    }

    fn bulk_rewrite_prefix(&self, old_prefix: &str, new_prefix: &str) -> StoreResult<usize> {
        let mut records = self.write()?;

        let untouched: HashSet<String> = records
            .values()
            .filter(|r| !r.is_under(old_prefix))
            .map(|r| r.stored_path.clone())
            .collect();

        let rewrites: Vec<(RecordId, String)> = records
            .values()
            .filter(|r| r.is_under(old_prefix))
            .map(|r| {
                let rest = &r.stored_path[old_prefix.len()..];
                (r.id, format!("{new_prefix}{rest}"))
            })
            .collect();

        // Validate everything before touching anything.
        if let Some((_, path)) = rewrites.iter().find(|(_, p)| untouched.contains(p)) {
            return Err(StoreError::DuplicatePath { path: path.clone() });
        }

        for (id, path) in &rewrites {
            if let Some(record) = records.get_mut(id) {
                record.stored_path.clone_from(path);
            }
        }

        Ok(rewrites.len())
    }

    fn create_record(&self, path: &str) -> StoreResult<MetadataRecord> {
        let mut records = self.write()?;
        if records.values().any(|r| r.stored_path == path) {
            return Err(StoreError::DuplicatePath {
                path: path.to_string(),
            });
        }

        let id = RecordId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let record = MetadataRecord::new(id, path, self.separator);
        records.insert(id, record.clone());
        Ok(record)
    }

    fn save(&self, record: &MetadataRecord) -> StoreResult<()> {
        let mut records = self.write()?;
        if !records.contains_key(&record.id) {
            return Err(StoreError::NotFound { id: record.id });
        }
        if records
            .values()
            .any(|r| r.id != record.id && r.stored_path == record.stored_path)
        {
            return Err(StoreError::DuplicatePath {
                path: record.stored_path.clone(),
            });
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    fn all(&self) -> StoreResult<Vec<MetadataRecord>> {
        Ok(self.read()?.values().cloned().collect())
    }
}
