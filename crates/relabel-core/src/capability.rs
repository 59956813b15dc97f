//! Permission flags held by the acting session.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A single permission flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// May rename files.
    RenameFile,
    /// May rename folders.
    RenameFolder,
}

impl Capability {
    /// All known capabilities.
    pub const ALL: [Capability; 2] = [Capability::RenameFile, Capability::RenameFolder];
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RenameFile => write!(f, "rename_file"),
            Self::RenameFolder => write!(f, "rename_folder"),
        }
    }
}

/// The set of capabilities granted to an actor for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(HashSet<Capability>);

impl CapabilitySet {
    /// An empty set; every check against it fails.
    pub fn none() -> Self {
        Self::default()
    }

    /// A set granting every known capability.
    pub fn all() -> Self {
        Capability::ALL.into_iter().collect()
    }

    /// Grant a capability.
    pub fn grant(mut self, capability: Capability) -> Self {
        self.0.insert(capability);
        self
    }

    /// Revoke a capability.
    pub fn revoke(mut self, capability: Capability) -> Self {
        self.0.remove(&capability);
        self
    }

    /// Check whether a capability is granted.
    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
