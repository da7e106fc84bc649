#![cfg_attr(docsrs, feature(doc_cfg))]

//! # vitrine
//!
//! Build a frontend project with its bundler (Vite by default) while the host
//! crate compiles, then embed the bundler's output so the host can serve it
//! without touching the filesystem at runtime.
//!
//! ## Quick Start
//!
//! ### From `build.rs`
//!
//! ```no_run
//! use vitrine::ProjectConfig;
//!
//! # fn main() -> vitrine::Result<()> {
//! let config = ProjectConfig::new("frontend")
//!     .with_entries(["app/index.html", "./script.js"])
//!     .with_alias("bundle", "./script.js");
//!
//! vitrine::build_script::embed(&config, "assets.vitrine")?;
//! # Ok(()) }
//! ```
//!
//! ### At runtime
//!
//! ```ignore
//! static PACK: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/assets.vitrine"));
//!
//! let store = vitrine::AssetStore::unpack(PACK)?;
//! if let Some(bundle) = store.resolve("bundle") {
//!     println!("{}", bundle.html_tags("/"));
//! }
//! ```

use std::path::{Path, PathBuf};

pub mod build;
pub mod build_script;
pub mod cache;
pub mod content_type;
pub mod fingerprint;
pub mod lookup;
pub mod manifest;
pub mod pack;
pub mod store;

// Logging utilities (optional, enabled with "logging" feature)
#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;

#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub use logging::{LogLevel, init_logging, init_logging_from_env};

pub use build::{
    BuildOutcome, Bundler, BundlerInvocation, BundlerOutput, Orchestrator, PackageManager,
    ProcessBundler,
};
pub use cache::BuildCache;
pub use fingerprint::{Fingerprint, FingerprintOptions};
pub use lookup::ResolvedAsset;
pub use manifest::{AliasTable, AssetRecord, Manifest, OutputPath};
pub use store::{AssetStore, EmbeddedAsset};

pub use vitrine_config::{
    BundlerCommand, CacheSettings, ConfigDiscovery, ConfigError, EntryInput, FingerprintConfig,
    ProjectConfig,
};

/// Error types for vitrine operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or empty entry set, unreadable root, bad aliases.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Missing file or unreadable path.
    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Bundler failure, missing manifest, or an entry the manifest does not cover.
    #[error("Build failed: {message}")]
    Build {
        message: String,
        stderr: String,
        exit_code: Option<i32>,
    },

    /// The bundler's manifest does not match the expected schema.
    #[error("Invalid manifest: {0}")]
    ManifestFormat(String),

    /// Build cache could not be written or locked.
    #[error("Build cache error: {0}")]
    Cache(String),

    /// Packed asset bundle is corrupt or from an incompatible version.
    #[error("Invalid asset pack: {0}")]
    Pack(String),
}

/// Result type alias for vitrine operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn fs(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Error::Filesystem {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn build(message: impl Into<String>) -> Self {
        Error::Build {
            message: message.into(),
            stderr: String::new(),
            exit_code: None,
        }
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::Config(_) => "vitrine::config",
            Error::Filesystem { .. } => "vitrine::filesystem",
            Error::Build { .. } => "vitrine::build",
            Error::ManifestFormat(_) => "vitrine::manifest",
            Error::Cache(_) => "vitrine::cache",
            Error::Pack(_) => "vitrine::pack",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::Config(ConfigError::NoEntries) => Some(Box::new(
                "Declare at least one entry, e.g. entries = [\"index.html\"] in vitrine.toml",
            )),
            Error::Config(ConfigError::EmptyExpansion(pattern)) => Some(Box::new(format!(
                "No file under the project root matches '{}'. Check the pattern is relative to the root.",
                pattern
            ))),
            Error::Build { stderr, exit_code, .. } if !stderr.trim().is_empty() => {
                let header = match exit_code {
                    Some(code) => format!("Bundler exited with status {}. Output:", code),
                    None => "Bundler output:".to_string(),
                };
                Some(Box::new(format!("{}\n{}", header, stderr.trim_end())))
            }
            Error::ManifestFormat(_) => Some(Box::new(
                "The bundler wrote a manifest vitrine does not understand. Make sure `build.manifest` is enabled in your bundler config.",
            )),
            Error::Cache(_) => Some(Box::new(
                "Delete the cache file or set cache.enabled = false to build without it.",
            )),
            Error::Pack(_) => Some(Box::new(
                "Rebuild the asset pack with the same vitrine version that reads it.",
            )),
            _ => None,
        }
    }
}

/// Run the whole pipeline for `config`: build (or reuse the cached build),
/// then embed the output into an [`AssetStore`].
///
/// The build cache is loaded from and persisted to [`ProjectConfig::cache_file`]
/// unless caching is disabled.
pub fn build_assets(config: &ProjectConfig) -> Result<AssetStore> {
    let mut cache = BuildCache::open(config)?;
    let manifest = Orchestrator::new(ProcessBundler::new()).ensure_built(config, &mut cache)?;
    AssetStore::new(manifest)
}
