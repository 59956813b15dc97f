//! Results of a rename invocation.

use serde::{Deserialize, Serialize};

use crate::ItemKind;

/// Why a rename did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The actor may not rename this item, or it sits under a protected path.
    PermissionDenied,
    /// An entry already exists at the new path.
    NameCollision,
    /// The file is not writable, even after one attempt to grant write access.
    NotWritable,
    /// The filesystem move or the file's metadata update failed.
    FilesystemError,
    /// A folder's nested records could not be rewritten.
    MetadataUpdateFailed,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "Permission denied"),
            Self::NameCollision => write!(f, "Name already in use"),
            Self::NotWritable => write!(f, "Not writable"),
            Self::FilesystemError => write!(f, "Filesystem error"),
            Self::MetadataUpdateFailed => write!(f, "Metadata update failed"),
        }
    }
}

/// A folder that was renamed on disk while its records still point at the
/// old prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialRename {
    /// Old folder prefix, separator-terminated.
    pub old_prefix: String,
    /// New folder prefix, separator-terminated.
    pub new_prefix: String,
}

/// A completed rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameSuccess {
    pub kind: ItemKind,
    pub old_name: String,
    pub new_name: String,
    pub old_path: String,
    pub new_path: String,
    /// Number of metadata records rewritten.
    pub affected_records: usize,
}

/// A rename that stopped before completing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameFailure {
    pub reason: FailureReason,
    pub kind: ItemKind,
    pub old_name: String,
    /// The resolved new name, once known.
    pub new_name: Option<String>,
    /// Human-readable detail, typically the underlying error.
    pub detail: String,
    /// Set when the directory rename stuck but the index was not updated.
    pub partial: Option<PartialRename>,
}

impl RenameFailure {
    /// Create a failure without partial state.
    pub fn new(
        reason: FailureReason,
        kind: ItemKind,
        old_name: impl Into<String>,
        new_name: Option<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            reason,
            kind,
            old_name: old_name.into(),
            new_name,
            detail: detail.into(),
            partial: None,
        }
    }

    /// Attach partial-rename state.
    pub fn with_partial(mut self, partial: PartialRename) -> Self {
        self.partial = Some(partial);
        self
    }
}

/// The single result of a rename invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenameOutcome {
    Success(RenameSuccess),
    Failure(RenameFailure),
}

impl RenameOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The failure reason, if any.
    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            Self::Success(_) => None,
            Self::Failure(f) => Some(f.reason),
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            Self::Success(s) => s.kind,
            Self::Failure(f) => f.kind,
        }
    }
}

impl From<RenameFailure> for RenameOutcome {
    fn from(failure: RenameFailure) -> Self {
        Self::Failure(failure)
    }
}

impl From<RenameSuccess> for RenameOutcome {
    fn from(success: RenameSuccess) -> Self {
        Self::Success(success)
    }
}
