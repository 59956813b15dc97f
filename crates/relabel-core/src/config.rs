//! Rename configuration.

use std::fs;
use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Configuration for the rename engine.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct RenameConfig {
    /// Maximum length of user input kept before sanitizing, in code points.
    #[builder(default = "50")]
    pub max_name_chars: usize,

    /// Path separator used by the backing storage.
    #[builder(default = "'/'")]
    pub separator: char,

    /// A parent path that already denotes a boundary, such as a storage
    /// root alias. Names are appended to it without a separator.
    #[builder(default)]
    pub root_alias: Option<String>,

    /// Paths whose entries, and everything beneath them, may not be renamed.
    #[builder(default)]
    pub protected_paths: Vec<String>,

    /// Mode applied once to a file that is not writable.
    #[builder(default = "0o664")]
    pub writable_mode: u32,

    /// Undo the filesystem change when the metadata update that follows it fails.
    #[builder(default = "true")]
    pub rollback_on_metadata_failure: bool,

    /// SQLite database holding metadata records.
    #[builder(default)]
    pub database: Option<PathBuf>,
}

impl RenameConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.max_name_chars == Some(0) {
            return Err("max_name_chars must be greater than zero".to_string());
        }
        if let Some(separator) = self.separator {
            check_separator(separator)?;
        }
        Ok(())
    }
}

fn check_separator(separator: char) -> Result<(), String> {
    if separator.is_alphanumeric() || separator.is_whitespace() || matches!(separator, '_' | '-') {
        return Err(format!("'{}' cannot be used as a path separator", separator));
    }
    Ok(())
}

impl RenameConfig {
    /// Create a new config builder.
    pub fn builder() -> RenameConfigBuilder {
        RenameConfigBuilder::default()
    }

    /// Location of the user configuration file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("relabel").join("config.toml"))
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load an explicit file, or the user file when it exists, or defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Check values that serde cannot enforce.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_name_chars == 0 {
            return Err(ConfigError::Invalid {
                message: "max_name_chars must be greater than zero".to_string(),
            });
        }
        check_separator(self.separator).map_err(|message| ConfigError::Invalid { message })
    }
}

impl Default for RenameConfig {
    fn default() -> Self {
        Self {
            max_name_chars: 50,
            separator: '/',
            root_alias: None,
            protected_paths: Vec::new(),
            writable_mode: 0o664,
            rollback_on_metadata_failure: true,
            database: None,
        }
    }
}
