//! Rename engine for relabel.
//!
//! This crate renames a single file or folder, keeping the metadata index in
//! step with the filesystem. A request passes the permission gate, has its
//! raw name sanitized and resolved against the parent folder, is checked for
//! collisions under a per-path lock, and is then applied to the filesystem and
//! the index. Every invocation ends in exactly one [`RenameOutcome`], which
//! [`OutcomeReporter`] turns into a message for the host.
//!
//! [`RenameOutcome`]: relabel_core::RenameOutcome

mod engine;
mod fs;
mod lock;
mod path;
mod permission;
mod progress;
mod rename;
mod report;
mod sanitize;

pub use engine::RenameEngine;
pub use fs::{Filesystem, LocalFilesystem};
pub use lock::PathLocks;
pub use path::PathResolver;
pub use permission::{ConfiguredPermissions, PermissionEngine, PermissionGate};
pub use progress::RenameState;
pub use rename::{RenameResult, start_rename};
pub use report::{ListUpdate, MessageLevel, OutcomeReporter, Report};
pub use sanitize::{AsciiTransliterator, NameSanitizer, SanitizedName, Transliterator};

/// Channel buffer size for rename progress updates.
pub const OPERATION_CHANNEL_SIZE: usize = 16;
