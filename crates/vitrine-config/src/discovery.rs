//! File-based config discovery
//!
//! Finds the project descriptor in a directory and loads it.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{ConfigError, Result};
use crate::project::ProjectConfig;

pub const CONFIG_FILE_NAME: &str = "vitrine.toml";

/// File-based configuration discovery
///
/// # Example
///
/// ```no_run
/// use vitrine_config::ConfigDiscovery;
///
/// let config = ConfigDiscovery::new("frontend").load().unwrap();
/// ```
pub struct ConfigDiscovery {
    root: PathBuf,
}

impl ConfigDiscovery {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Find a config file in the root directory
    ///
    /// Searches in this order:
    /// 1. `vitrine.toml`
    /// 2. `package.json` (`vitrine` field)
    pub fn find(&self) -> Option<PathBuf> {
        let toml_path = self.root.join(CONFIG_FILE_NAME);
        if toml_path.is_file() {
            return Some(toml_path);
        }

        let pkg_path = self.root.join("package.json");
        let content = fs::read_to_string(&pkg_path).ok()?;
        let parsed = serde_json::from_str::<Value>(&content).ok()?;
        match parsed.get("vitrine") {
            Some(section) if !section.is_null() => Some(pkg_path),
            _ => None,
        }
    }

    /// Load config from the discovered file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if no config file is found.
    pub fn load(&self) -> Result<ProjectConfig> {
        let path = self
            .find()
            .ok_or_else(|| ConfigError::NotFound(self.root.clone()))?;
        ProjectConfig::load(&path)
    }
}

/// Discover and load config from the current directory
pub fn discover() -> Result<ProjectConfig> {
    let root = std::env::current_dir()?;
    ConfigDiscovery::new(&root).load()
}
