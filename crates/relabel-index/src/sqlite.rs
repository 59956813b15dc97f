//! SQLite backed metadata store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use tracing::debug;

use relabel_core::{MetadataRecord, RecordId};

use crate::{MetadataStore, StoreError, StoreResult};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS file_records (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    stored_path TEXT NOT NULL UNIQUE,
    filename    TEXT NOT NULL
);
";

// Prefix matching compares a leading substring instead of using LIKE, so
// '%' and '_' inside stored paths never act as wildcards. SQLite's substr and
// length both count characters for TEXT values.
const SELECT_BY_PREFIX: &str = "
SELECT id, stored_path, filename FROM file_records
WHERE substr(stored_path, 1, length(?1)) = ?1
ORDER BY id
";

const REWRITE_PREFIX: &str = "
UPDATE file_records
SET stored_path = ?2 || substr(stored_path, length(?1) + 1)
WHERE substr(stored_path, 1, length(?1)) = ?1
";

/// A metadata store persisted in a SQLite database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    separator: char,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("separator", &self.separator)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (and create if needed) a database file.
    pub fn open(path: &Path) -> StoreResult<Self> {
        debug!(path = %path.display(), "opening metadata database");
        Self::from_connection(Connection::open(path)?)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Wrap an existing connection, creating the schema if needed.
    pub fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            separator: '/',
        })
    }

    /// Use a different separator when deriving filenames for new records.
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<MetadataRecord> {
    let id: i64 = row.get(0)?;
    Ok(MetadataRecord {
        id: RecordId::new(id as u64),
        stored_path: row.get(1)?,
        filename: row.get(2)?,
    })
}

/// Turn a unique-constraint failure into a duplicate path error.
fn classify(err: rusqlite::Error, path: &str) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            StoreError::DuplicatePath {
                path: path.to_string(),
            }
        }
        _ => StoreError::Sqlite(err),
    }
}

impl MetadataStore for SqliteStore {
    fn find_by_path(&self, path: &str) -> StoreResult<Option<MetadataRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                "SELECT id, stored_path, filename FROM file_records WHERE stored_path = ?1",
                params![path],
                map_row,
            )
            .optional()?;
        Ok(record)
    }

    fn find_by_path_prefix(&self, prefix: &str) -> StoreResult<Vec<MetadataRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(SELECT_BY_PREFIX)?;
        let records = stmt
            .query_map(params![prefix], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn bulk_rewrite_prefix(&self, old_prefix: &str, new_prefix: &str) -> StoreResult<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let count = tx
            .execute(REWRITE_PREFIX, params![old_prefix, new_prefix])
            .map_err(|e| classify(e, new_prefix))?;
        tx.commit()?;
        Ok(count)
    }

    fn create_record(&self, path: &str) -> StoreResult<MetadataRecord> {
        let conn = self.conn()?;
        let filename = path.rsplit(self.separator).next().unwrap_or_default();
        conn.execute(
            "INSERT INTO file_records (stored_path, filename) VALUES (?1, ?2)",
            params![path, filename],
        )
        .map_err(|e| classify(e, path))?;

        Ok(MetadataRecord {
            id: RecordId::new(conn.last_insert_rowid() as u64),
            stored_path: path.to_string(),
            filename: filename.to_string(),
        })
    }

    fn save(&self, record: &MetadataRecord) -> StoreResult<()> {
        let conn = self.conn()?;
        let updated = conn
            .execute(
                "UPDATE file_records SET stored_path = ?2, filename = ?3 WHERE id = ?1",
                params![record.id.0 as i64, record.stored_path, record.filename],
            )
            .map_err(|e| classify(e, &record.stored_path))?;
        if updated == 0 {
            return Err(StoreError::NotFound { id: record.id });
        }
        Ok(())
    }

    fn all(&self) -> StoreResult<Vec<MetadataRecord>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, stored_path, filename FROM file_records ORDER BY id")?;
        let records = stmt
            .query_map([], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(paths: &[&str]) -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        for path in paths {
            store.create_record(path).unwrap();
        }
        store
    }

    #[test]
    fn test_create_and_find() {
        let store = store_with(&["/docs/report.pdf"]);
        let record = store.find_by_path("/docs/report.pdf").unwrap().unwrap();
        assert_eq!(record.filename, "report.pdf");
        assert!(store.find_by_path("/docs/other.pdf").unwrap().is_none());
    }

    #[test]
    fn test_prefix_has_no_wildcards() {
        let store = store_with(&["/a_b/x", "/axb/y", "/a%/z", "/a%b/w"]);

        let under_underscore = store.find_by_path_prefix("/a_b/").unwrap();
        assert_eq!(under_underscore.len(), 1);
        assert_eq!(under_underscore[0].stored_path, "/a_b/x");

        let under_percent = store.find_by_path_prefix("/a%/").unwrap();
        assert_eq!(under_percent.len(), 1);
        assert_eq!(under_percent[0].stored_path, "/a%/z");
    }

    #[test]
    fn test_rewrite_prefix() {
        let store = store_with(&["a/b/x", "a/bc/y", "a/b/z", "a/b/deep/q"]);

        let count = store.bulk_rewrite_prefix("a/b/", "a/renamed/").unwrap();
        assert_eq!(count, 3);

        let paths: Vec<String> = store
            .all()
            .unwrap()
            .into_iter()
            .map(|r| r.stored_path)
            .collect();
        assert_eq!(
            paths,
            vec!["a/renamed/x", "a/bc/y", "a/renamed/z", "a/renamed/deep/q"]
        );
    }

    #[test]
    fn test_rewrite_with_multibyte_prefix() {
        let store = store_with(&["/café/menu.txt", "/cafés/x.txt"]);
        let count = store.bulk_rewrite_prefix("/café/", "/cafe/").unwrap();
        assert_eq!(count, 1);
        assert!(store.find_by_path("/cafe/menu.txt").unwrap().is_some());
        assert!(store.find_by_path("/cafés/x.txt").unwrap().is_some());
    }

    #[test]
    fn test_rewrite_conflict_rolls_back() {
        let store = store_with(&["old/x", "new/x", "old/y"]);

        assert!(matches!(
            store.bulk_rewrite_prefix("old/", "new/"),
            Err(StoreError::DuplicatePath { .. })
        ));
        assert_eq!(store.find_by_path_prefix("old/").unwrap().len(), 2);
    }

    #[test]
    fn test_save() {
        let store = store_with(&["/a.txt"]);
        let mut record = store.find_by_path("/a.txt").unwrap().unwrap();
        record.relocate("/b.txt", "b.txt");
        store.save(&record).unwrap();

        assert!(store.find_by_path("/a.txt").unwrap().is_none());
        let saved = store.find_by_path("/b.txt").unwrap().unwrap();
        assert_eq!(saved.filename, "b.txt");
        assert_eq!(saved.id, record.id);
    }
}
