//! The project descriptor.
//!
//! A [`ProjectConfig`] describes one frontend project: where it lives, which
//! entry points the bundler should build, where the output lands and how the
//! build cache behaves. It is created once per build invocation and never
//! mutated afterwards.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use path_clean::PathClean;
use serde::{Deserialize, Serialize};

use crate::entry::{normalize_entry_path, EntryInput};
use crate::error::{ConfigError, Result};

/// Default output directory, relative to the project root.
pub const DEFAULT_OUT_DIR: &str = "dist";

/// Default public asset directory, relative to the project root.
pub const DEFAULT_PUBLIC_DIR: &str = "public";

/// Default cache file location, relative to the project root.
pub const DEFAULT_CACHE_FILE: &str = ".vitrine/cache.json";

/// Manifest locations tried when `manifest_path` is unset, relative to the output directory.
///
/// Vite 5+ writes `.vite/manifest.json`; older releases wrote `manifest.json`.
pub const MANIFEST_CANDIDATES: [&str; 2] = [".vite/manifest.json", "manifest.json"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project root. Relative paths resolve against the descriptor's directory.
    pub root: PathBuf,

    /// Entry inputs, relative to `root`. Entries with `*`, `?` or `[` are globs.
    pub entries: Vec<String>,

    pub out_dir: PathBuf,

    pub public_dir: PathBuf,

    /// Renamed bundles: alias name to input path.
    pub aliases: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundler: Option<BundlerCommand>,

    /// Manifest location relative to `out_dir`. Overrides the Vite defaults.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<PathBuf>,

    pub fingerprint: FingerprintConfig,

    pub cache: CacheSettings,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            entries: Vec::new(),
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            public_dir: PathBuf::from(DEFAULT_PUBLIC_DIR),
            aliases: BTreeMap::new(),
            bundler: None,
            manifest_path: None,
            fingerprint: FingerprintConfig::default(),
            cache: CacheSettings::default(),
        }
    }
}

/// An explicit bundler command line: program followed by its arguments.
///
/// Arguments may use the `{out_dir}`, `{manifest}` and `{entries}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BundlerCommand {
    pub command: Vec<String>,
}

impl BundlerCommand {
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into_iter().map(Into::into).collect(),
        }
    }

    pub fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }

    pub fn args(&self) -> &[String] {
        self.command.get(1..).unwrap_or_default()
    }
}

/// Include/exclude globs for the fingerprint walk.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,

    /// Cache file, relative to the project root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    pub force_rebuild: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            force_rebuild: false,
        }
    }
}

/// The part of a config that determines what gets built, hashed for [`ProjectConfig::identity`].
#[derive(Serialize)]
struct IdentityShape<'a> {
    entries: Vec<String>,
    out_dir: &'a Path,
    public_dir: &'a Path,
    aliases: BTreeMap<String, String>,
    bundler: Option<&'a BundlerCommand>,
    manifest_path: Option<&'a Path>,
    fingerprint: &'a FingerprintConfig,
}

impl ProjectConfig {
    /// Start a config rooted at `root` with every other field at its default.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn with_entries<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries = entries.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entries.push(entry.into());
        self
    }

    pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = out_dir.into();
        self
    }

    pub fn with_public_dir(mut self, public_dir: impl Into<PathBuf>) -> Self {
        self.public_dir = public_dir.into();
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        self.aliases.insert(alias.into(), target.into());
        self
    }

    pub fn with_bundler(mut self, command: BundlerCommand) -> Self {
        self.bundler = Some(command);
        self
    }

    pub fn with_manifest_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest_path = Some(path.into());
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: FingerprintConfig) -> Self {
        self.fingerprint = fingerprint;
        self
    }

    pub fn with_cache(mut self, cache: CacheSettings) -> Self {
        self.cache = cache;
        self
    }

    /// Check the descriptor against the filesystem and its own invariants.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::RootNotFound`] if the root is missing or not a directory
    /// - [`ConfigError::NoEntries`] if no entry is declared
    /// - [`ConfigError::OutputOutsideRoot`] if the output directory escapes the root
    /// - [`ConfigError::InvalidAlias`] for empty alias names or targets
    pub fn validate(&self) -> Result<()> {
        if !self.root.is_dir() {
            return Err(ConfigError::RootNotFound(self.root.clone()));
        }

        if self.entries.iter().all(|entry| entry.trim().is_empty()) {
            return Err(ConfigError::NoEntries);
        }

        if let Some(entry) = self.entries.iter().find(|e| e.trim().is_empty()) {
            return Err(ConfigError::invalid("entries", format!("empty entry `{entry}`")));
        }

        if !stays_within(&self.out_dir) {
            return Err(ConfigError::OutputOutsideRoot {
                out_dir: self.out_dir.clone(),
                root: self.root.clone(),
            });
        }

        if let Some(manifest) = &self.manifest_path {
            if !stays_within(manifest) {
                return Err(ConfigError::invalid(
                    "manifest_path",
                    "must be a relative path inside the output directory",
                ));
            }
        }

        for (alias, target) in &self.aliases {
            if alias.trim().is_empty() {
                return Err(ConfigError::InvalidAlias {
                    alias: alias.clone(),
                    reason: "alias name is empty".to_string(),
                });
            }
            if normalize_entry_path(target).is_empty() {
                return Err(ConfigError::InvalidAlias {
                    alias: alias.clone(),
                    reason: "alias target is empty".to_string(),
                });
            }
        }

        if let Some(bundler) = &self.bundler {
            if bundler.program().is_none_or(|p| p.trim().is_empty()) {
                return Err(ConfigError::invalid("bundler.command", "command is empty"));
            }
        }

        Ok(())
    }

    /// Stable identity of this project's declared shape, used as the build cache key.
    ///
    /// The absolute root is left out so a checkout moved to another directory
    /// keeps hitting its cache.
    pub fn identity(&self) -> String {
        let shape = IdentityShape {
            entries: self
                .entries
                .iter()
                .map(|entry| normalize_entry_path(entry))
                .collect(),
            out_dir: &self.out_dir,
            public_dir: &self.public_dir,
            aliases: self.normalized_aliases(),
            bundler: self.bundler.as_ref(),
            manifest_path: self.manifest_path.as_deref(),
            fingerprint: &self.fingerprint,
        };

        // Serializing plain strings, paths and maps cannot fail.
        let bytes = serde_json::to_vec(&shape).unwrap_or_default();
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"vitrine-project-v1\0");
        hasher.update(&bytes);
        hasher.finalize().to_hex()[..32].to_string()
    }

    pub fn entry_inputs(&self) -> Vec<EntryInput> {
        self.entries
            .iter()
            .filter(|entry| !entry.trim().is_empty())
            .map(|entry| EntryInput::parse(entry))
            .collect()
    }

    /// Alias table with every target normalized to manifest-key form.
    pub fn normalized_aliases(&self) -> BTreeMap<String, String> {
        self.aliases
            .iter()
            .map(|(alias, target)| (alias.clone(), normalize_entry_path(target)))
            .collect()
    }

    pub fn absolute_out_dir(&self) -> PathBuf {
        self.resolve_in_root(&self.out_dir)
    }

    pub fn absolute_public_dir(&self) -> PathBuf {
        self.resolve_in_root(&self.public_dir)
    }

    /// Candidate manifest paths, in lookup order.
    pub fn manifest_candidates(&self) -> Vec<PathBuf> {
        let out_dir = self.absolute_out_dir();
        match &self.manifest_path {
            Some(path) => vec![out_dir.join(path).clean()],
            None => MANIFEST_CANDIDATES
                .iter()
                .map(|candidate| out_dir.join(candidate))
                .collect(),
        }
    }

    pub fn cache_file(&self) -> PathBuf {
        match &self.cache.path {
            Some(path) => self.resolve_in_root(path),
            None => self.root.join(DEFAULT_CACHE_FILE).clean(),
        }
    }

    /// Resolve the root against `base` if it is relative.
    pub fn rooted_at(mut self, base: &Path) -> Self {
        if self.root.is_relative() {
            self.root = base.join(&self.root).clean();
        }
        self
    }

    /// Make the root absolute, resolving a relative root against the current directory.
    pub fn into_absolute(self) -> Result<Self> {
        if self.root.is_absolute() {
            return Ok(self);
        }
        let cwd = std::env::current_dir()?;
        Ok(self.rooted_at(&cwd))
    }

    fn resolve_in_root(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf().clean()
        } else {
            self.root.join(path).clean()
        }
    }
}

/// True if `path` is relative and never climbs above its base once cleaned.
fn stays_within(path: &Path) -> bool {
    if path.is_absolute() {
        return false;
    }
    let cleaned = path.clean();
    !cleaned
        .components()
        .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
}
