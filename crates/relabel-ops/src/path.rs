//! Building storage paths for items.

use relabel_core::RenameConfig;

/// Joins names onto parent paths regardless of trailing separators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    separator: char,
    root_alias: Option<String>,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new('/', None)
    }
}

impl PathResolver {
    pub fn new(separator: char, root_alias: Option<String>) -> Self {
        Self {
            separator,
            root_alias,
        }
    }

    pub fn from_config(config: &RenameConfig) -> Self {
        Self::new(config.separator, config.root_alias.clone())
    }

    /// Path of `name` inside `parent`.
    ///
    /// Exactly one separator ends up between the two, except when `parent`
    /// is the root alias (compared exactly), which is used as-is.
    pub fn resolve(&self, parent: &str, name: &str) -> String {
        if self.root_alias.as_deref() == Some(parent) {
            return format!("{parent}{name}");
        }
        if parent.is_empty() {
            return name.to_string();
        }
        let parent = parent.trim_end_matches(self.separator);
        format!("{parent}{}{name}", self.separator)
    }

    /// `path` with exactly one trailing separator, for anchored prefix matching.
    pub fn folder_prefix(&self, path: &str) -> String {
        format!("{}{}", path.trim_end_matches(self.separator), self.separator)
    }

    /// Check whether `path` is `ancestor` itself or lies beneath it.
    pub fn is_within(&self, path: &str, ancestor: &str) -> bool {
        let trimmed = ancestor.trim_end_matches(self.separator);
        path.trim_end_matches(self.separator) == trimmed
            || path.starts_with(&self.folder_prefix(ancestor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_trailing_separators() {
        let resolver = PathResolver::default();
        assert_eq!(resolver.resolve("/docs", "a.txt"), "/docs/a.txt");
        assert_eq!(resolver.resolve("/docs/", "a.txt"), "/docs/a.txt");
        assert_eq!(resolver.resolve("/docs//", "a.txt"), "/docs/a.txt");
        assert_eq!(resolver.resolve("/", "a.txt"), "/a.txt");
        assert_eq!(resolver.resolve("", "a.txt"), "a.txt");
    }

    #[test]
    fn test_resolve_root_alias_exact_match() {
        let resolver = PathResolver::new('/', Some("local:".to_string()));
        assert_eq!(resolver.resolve("local:", "a.txt"), "local:a.txt");
        // Only an exact match is special.
        assert_eq!(resolver.resolve("local:/docs", "a.txt"), "local:/docs/a.txt");
    }

    #[test]
    fn test_folder_prefix() {
        let resolver = PathResolver::default();
        assert_eq!(resolver.folder_prefix("/a/b"), "/a/b/");
        assert_eq!(resolver.folder_prefix("/a/b/"), "/a/b/");
    }

    #[test]
    fn test_is_within() {
        let resolver = PathResolver::default();
        assert!(resolver.is_within("/srv/app", "/srv/app"));
        assert!(resolver.is_within("/srv/app/x.txt", "/srv/app/"));
        assert!(!resolver.is_within("/srv/application", "/srv/app"));
        assert!(!resolver.is_within("/srv", "/srv/app"));
    }

    #[test]
    fn test_other_separator() {
        let resolver = PathResolver::new('\\', None);
        assert_eq!(resolver.resolve("C:\\Users\\", "a.txt"), "C:\\Users\\a.txt");
        assert_eq!(resolver.folder_prefix("C:\\Users"), "C:\\Users\\");
    }
}
