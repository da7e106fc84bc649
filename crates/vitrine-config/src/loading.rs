use std::fs;
use std::path::Path;

use figment::{
    providers::{Env, Format as _, Serialized, Toml},
    Figment,
};
use serde_json::Value;

use crate::error::{ConfigError, Result};
use crate::project::ProjectConfig;

/// Environment variables that may override the descriptor (`VITRINE_OUT_DIR`, ...).
const ENV_OVERRIDES: &[&str] = &["out_dir", "public_dir", "manifest_path"];

impl ProjectConfig {
    /// Load a descriptor file with layered overrides.
    ///
    /// Priority: environment variables > descriptor file > defaults.
    /// `path` is either a `vitrine.toml` or a `package.json` carrying a
    /// `"vitrine"` field. A relative `root` resolves against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let mut figment = Figment::new().merge(Serialized::defaults(ProjectConfig::default()));

        if path.file_name() == Some(std::ffi::OsStr::new("package.json")) {
            figment = figment.merge(Serialized::defaults(package_json_section(path)?));
        } else {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("VITRINE_").only(ENV_OVERRIDES));

        let config: ProjectConfig = figment.extract().map_err(|e| {
            let field = if e.path.is_empty() {
                "configuration".to_string()
            } else {
                e.path.join(".")
            };
            ConfigError::InvalidValue {
                field,
                message: e.to_string(),
            }
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        tracing::debug!(path = %path.display(), "loaded vitrine config");
        Ok(config.rooted_at(base))
    }

    /// Parse a TOML descriptor from a string, without environment overrides.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::invalid("toml", e))
    }
}

fn package_json_section(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)?;

    let parsed: Value = serde_json::from_str(&content)
        .map_err(|e| ConfigError::invalid("package.json", format!("invalid JSON: {e}")))?;

    match parsed.get("vitrine") {
        Some(Value::Null) | None => Err(ConfigError::invalid(
            "vitrine",
            "add a non-null 'vitrine' field to your package.json",
        )),
        Some(section) => Ok(section.clone()),
    }
}
