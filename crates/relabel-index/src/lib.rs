//! Metadata index for relabel.
//!
//! This crate holds the secondary index of file records that reference
//! storage paths, with an in-memory and a SQLite backed store, and the
//! reindexer that rewrites path prefixes after a folder is renamed.

mod error;
mod memory;
mod reindex;
mod sqlite;
mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use reindex::MetadataReindexer;
pub use sqlite::SqliteStore;
pub use store::MetadataStore;
