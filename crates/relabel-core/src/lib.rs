//! Core types for relabel.
//!
//! This crate provides the data model shared by the rename engine and the
//! metadata index: selected items, capability flags, metadata records,
//! rename outcomes, errors and configuration.

mod capability;
mod config;
mod error;
mod item;
mod outcome;
mod record;

pub use capability::{Capability, CapabilitySet};
pub use config::{RenameConfig, RenameConfigBuilder};
pub use error::{ConfigError, FsError};
pub use item::{Item, ItemKind, RenameRequest};
pub use outcome::{FailureReason, PartialRename, RenameFailure, RenameOutcome, RenameSuccess};
pub use record::{MetadataRecord, RecordId};
