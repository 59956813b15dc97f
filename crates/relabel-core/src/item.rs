//! Selected items and rename requests.

use serde::{Deserialize, Serialize};

use crate::{Capability, CapabilitySet};

/// The kind of filesystem entry being renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    File,
    Folder,
}

impl ItemKind {
    pub fn is_folder(&self) -> bool {
        matches!(self, Self::Folder)
    }

    /// The capability required to rename an item of this kind.
    pub fn required_capability(&self) -> Capability {
        match self {
            Self::File => Capability::RenameFile,
            Self::Folder => Capability::RenameFolder,
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Folder => write!(f, "folder"),
        }
    }
}

/// A filesystem entry selected by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Current basename.
    pub name: String,
    /// File or folder.
    pub kind: ItemKind,
    /// Path of the containing folder.
    pub parent_path: String,
}

impl Item {
    /// Create a new item.
    pub fn new(name: impl Into<String>, kind: ItemKind, parent_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            parent_path: parent_path.into(),
        }
    }

    /// Create a file item.
    pub fn file(name: impl Into<String>, parent_path: impl Into<String>) -> Self {
        Self::new(name, ItemKind::File, parent_path)
    }

    /// Create a folder item.
    pub fn folder(name: impl Into<String>, parent_path: impl Into<String>) -> Self {
        Self::new(name, ItemKind::Folder, parent_path)
    }

    /// The extension of a file item: the text after the last dot, verbatim.
    ///
    /// Folders never have one. A dot in first position (`.env`) marks a
    /// hidden name rather than an extension, and a trailing dot yields none.
    pub fn extension(&self) -> Option<&str> {
        if self.kind.is_folder() {
            return None;
        }
        match self.name.rfind('.') {
            Some(idx) if idx > 0 && idx + 1 < self.name.len() => Some(&self.name[idx + 1..]),
            _ => None,
        }
    }
}

/// A single rename invocation.
#[derive(Debug, Clone)]
pub struct RenameRequest {
    /// The item under operation.
    pub item: Item,
    /// Untrusted user input for the new name.
    pub raw_new_name: String,
    /// Capabilities of the acting session.
    pub capabilities: CapabilitySet,
}

impl RenameRequest {
    /// Create a request for a single item.
    pub fn new(item: Item, raw_new_name: impl Into<String>, capabilities: CapabilitySet) -> Self {
        Self {
            item,
            raw_new_name: raw_new_name.into(),
            capabilities,
        }
    }

    /// Create a request from the host's current selection.
    ///
    /// Only the first selected item is renamed. Returns `None` when nothing
    /// is selected.
    pub fn from_selection(
        selection: impl IntoIterator<Item = Item>,
        raw_new_name: impl Into<String>,
        capabilities: CapabilitySet,
    ) -> Option<Self> {
        let item = selection.into_iter().next()?;
        Some(Self::new(item, raw_new_name, capabilities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension() {
        assert_eq!(Item::file("report.PDF", "/docs").extension(), Some("PDF"));
        assert_eq!(Item::file("archive.tar.gz", "/").extension(), Some("gz"));
        assert_eq!(Item::file("README", "/").extension(), None);
        assert_eq!(Item::file(".env", "/").extension(), None);
        assert_eq!(Item::file("odd.", "/").extension(), None);
        assert_eq!(Item::folder("photos.2024", "/").extension(), None);
    }

    #[test]
    fn test_from_selection() {
        assert!(RenameRequest::from_selection(vec![], "x", CapabilitySet::all()).is_none());

        let request = RenameRequest::from_selection(
            vec![Item::file("a.txt", "/"), Item::file("b.txt", "/")],
            "x",
            CapabilitySet::all(),
        )
        .unwrap();
        assert_eq!(request.item.name, "a.txt");
    }
}
