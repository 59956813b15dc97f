//! States a rename passes through.

use serde::{Deserialize, Serialize};

/// A step of the rename state machine.
///
/// States advance in declaration order. A failing check jumps straight to
/// [`RenameState::Reported`]; files skip [`RenameState::Reindexed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RenameState {
    Start,
    /// The permission gate allowed the request.
    Authorized,
    /// The sanitized new name is known.
    NameResolved,
    /// Nothing exists at the new path.
    CollisionChecked,
    /// The filesystem entry has been moved.
    Mutated,
    /// Nested metadata records have been rewritten.
    Reindexed,
    /// An outcome has been produced.
    Reported,
}

impl std::fmt::Display for RenameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "Starting"),
            Self::Authorized => write!(f, "Authorized"),
            Self::NameResolved => write!(f, "Name resolved"),
            Self::CollisionChecked => write!(f, "Collision checked"),
            Self::Mutated => write!(f, "Renamed on disk"),
            Self::Reindexed => write!(f, "Records reindexed"),
            Self::Reported => write!(f, "Done"),
        }
    }
}
