//! Deciding whether a session may rename an item.

use std::slice;
use std::sync::Arc;

use tracing::debug;

use relabel_core::{Capability, CapabilitySet, Item, RenameConfig};

use crate::PathResolver;

/// The host's permission checks.
pub trait PermissionEngine: Send + Sync {
    /// Check a single flag.
    fn has_permission(&self, capabilities: &CapabilitySet, flag: Capability) -> bool {
        capabilities.contains(flag)
    }

    /// Check that every flag is granted for every item.
    fn validate_permissions(
        &self,
        capabilities: &CapabilitySet,
        items: &[Item],
        flags: &[Capability],
    ) -> bool {
        !items.is_empty() && flags.iter().all(|f| self.has_permission(capabilities, *f))
    }

    /// Check that no item is, or lies under, a protected path.
    fn validate_predefined_path(&self, items: &[Item]) -> bool;
}

/// Permission checks backed by the configured protected paths.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredPermissions {
    protected: Vec<String>,
    resolver: PathResolver,
}

impl ConfiguredPermissions {
    pub fn new(protected: Vec<String>, resolver: PathResolver) -> Self {
        Self {
            protected,
            resolver,
        }
    }

    pub fn from_config(config: &RenameConfig) -> Self {
        Self::new(config.protected_paths.clone(), PathResolver::from_config(config))
    }
}

impl PermissionEngine for ConfiguredPermissions {
    fn validate_predefined_path(&self, items: &[Item]) -> bool {
        items.iter().all(|item| {
            let path = self.resolver.resolve(&item.parent_path, &item.name);
            !self
                .protected
                .iter()
                .any(|protected| self.resolver.is_within(&path, protected))
        })
    }
}

/// Combines the capability check and the protected path check.
#[derive(Clone)]
pub struct PermissionGate {
    engine: Arc<dyn PermissionEngine>,
}

impl std::fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionGate").finish_non_exhaustive()
    }
}

impl PermissionGate {
    pub fn new(engine: Arc<dyn PermissionEngine>) -> Self {
        Self { engine }
    }

    /// Allow the rename only if the kind-specific capability is granted and
    /// the item is not protected.
    pub fn authorize(&self, capabilities: &CapabilitySet, item: &Item) -> bool {
        let items = slice::from_ref(item);
        let flag = item.kind.required_capability();

        let granted = self.engine.validate_permissions(capabilities, items, &[flag]);
        let unprotected = self.engine.validate_predefined_path(items);

        debug!(item = %item.name, kind = %item.kind, granted, unprotected, "authorizing rename");
        granted && unprotected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(protected: &[&str]) -> PermissionGate {
        let protected = protected.iter().map(|p| p.to_string()).collect();
        PermissionGate::new(Arc::new(ConfiguredPermissions::new(
            protected,
            PathResolver::default(),
        )))
    }

    #[test]
    fn test_kind_specific_capability() {
        let gate = gate(&[]);
        let files_only = CapabilitySet::none().grant(Capability::RenameFile);

        assert!(gate.authorize(&files_only, &Item::file("a.txt", "/docs")));
        assert!(!gate.authorize(&files_only, &Item::folder("photos", "/docs")));
        assert!(!gate.authorize(&CapabilitySet::none(), &Item::file("a.txt", "/docs")));
    }

    #[test]
    fn test_protected_path_denies_even_with_capability() {
        let gate = gate(&["/system"]);
        let all = CapabilitySet::all();

        assert!(!gate.authorize(&all, &Item::folder("system", "/")));
        assert!(!gate.authorize(&all, &Item::file("boot.cfg", "/system/")));
        assert!(!gate.authorize(&all, &Item::file("deep.cfg", "/system/nested")));
        assert!(gate.authorize(&all, &Item::folder("systems", "/")));
    }

    #[test]
    fn test_both_checks_required() {
        let gate = gate(&["/locked"]);
        let folders_only = CapabilitySet::none().grant(Capability::RenameFolder);

        // Capability present, path protected.
        assert!(!gate.authorize(&folders_only, &Item::folder("inner", "/locked")));
        // Path free, capability missing.
        assert!(!gate.authorize(&folders_only, &Item::file("a.txt", "/open")));
        // Both satisfied.
        assert!(gate.authorize(&folders_only, &Item::folder("inner", "/open")));
    }
}
