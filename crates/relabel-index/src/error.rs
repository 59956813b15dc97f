//! Error types for metadata stores.

use thiserror::Error;

use relabel_core::RecordId;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading or updating metadata records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with this id does not exist.
    #[error("Record not found: {id}")]
    NotFound { id: RecordId },

    /// A write would leave two records with the same stored path.
    #[error("A record already exists for {path}")]
    DuplicatePath { path: String },

    /// The store's lock was poisoned by a panicking writer.
    #[error("Metadata store lock poisoned")]
    Poisoned,

    /// SQLite failure.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Any other backend failure.
    #[error("{message}")]
    Backend { message: String },
}

impl StoreError {
    /// Create a backend error from a message.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}
