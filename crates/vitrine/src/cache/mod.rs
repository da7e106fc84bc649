//! Persistent build cache.
//!
//! Remembers, per project identity, the source fingerprint and expanded entry
//! set of the last successful build together with the manifest it produced.
//! When both still match, the bundler does not need to run again.
//!
//! # Architecture
//!
//! - **Single JSON file**: `{ version, projects: { <identity>: { fingerprint, entries, manifest } } }`
//! - **Atomic replace**: written to `.<name>.<random>.tmp` in the same directory, then renamed over
//! - **Locked writes**: an exclusive lock on `<name>.lock` serializes writers
//! - **Lenient reads**: a corrupt or foreign file loads as an empty cache

mod lock;

pub use lock::{CacheLock, is_cache_artifact, lock_path_for};

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::Builder;

use crate::fingerprint::Fingerprint;
use crate::manifest::{Manifest, ManifestSnapshot};
use crate::{Error, ProjectConfig, Result};

/// Current cache format version. Increment when the file layout changes.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Environment variable that forces a rebuild when set.
pub const FORCE_REBUILD_ENV: &str = "VITRINE_FORCE_REBUILD";

/// The last successful build of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedProject {
    pub fingerprint: String,
    /// Expanded entry set, sorted.
    pub entries: Vec<String>,
    pub manifest: ManifestSnapshot,
}

impl CachedProject {
    pub fn new(fingerprint: &Fingerprint, entries: &[String], manifest: &Manifest) -> Self {
        let mut entries = entries.to_vec();
        entries.sort();
        entries.dedup();
        Self {
            fingerprint: fingerprint.hex().to_string(),
            entries,
            manifest: manifest.snapshot(),
        }
    }

    /// True if this build was made from the same sources and entry set.
    pub fn matches(&self, fingerprint: &Fingerprint, entries: &[String]) -> bool {
        if self.fingerprint != fingerprint.hex() {
            return false;
        }
        let mut current = entries.to_vec();
        current.sort();
        current.dedup();
        current == self.entries
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    #[serde(default)]
    projects: BTreeMap<String, CachedProject>,
}

/// Build cache state, passed explicitly to the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct BuildCache {
    path: Option<PathBuf>,
    projects: BTreeMap<String, CachedProject>,
}

impl BuildCache {
    /// A cache that lives only as long as this value.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// The cache configured for `config`: its cache file, or in-memory when caching is disabled.
    pub fn open(config: &ProjectConfig) -> Result<Self> {
        if config.cache.enabled {
            Self::load(config.cache_file())
        } else {
            Ok(Self::in_memory())
        }
    }

    /// Load the cache file at `path`.
    ///
    /// A missing file is an empty cache. A corrupt or version-mismatched file
    /// is also treated as empty (logged at warn), which forces a rebuild.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let projects = read_projects(&path)?;
        Ok(Self {
            path: Some(path),
            projects,
        })
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, identity: &str) -> Option<&CachedProject> {
        self.projects.get(identity)
    }

    pub fn insert(&mut self, identity: impl Into<String>, project: CachedProject) {
        self.projects.insert(identity.into(), project);
    }

    pub fn remove(&mut self, identity: &str) -> Option<CachedProject> {
        self.projects.remove(identity)
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Write the cache to its file atomically. No-op for in-memory caches.
    ///
    /// Entries written meanwhile by other processes for other identities are kept.
    pub fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| Error::fs(&dir, e))?;

        let _lock = CacheLock::acquire(path)?;

        let mut projects = read_projects(path)?;
        projects.extend(self.projects.clone());
        let file = CacheFile {
            version: CACHE_FORMAT_VERSION,
            projects,
        };
        let bytes = serde_json::to_vec_pretty(&file)
            .map_err(|e| Error::Cache(format!("failed to serialize build cache: {}", e)))?;

        let (prefix, suffix) = lock::temp_name_parts(path);
        let mut temp = Builder::new()
            .prefix(&prefix)
            .suffix(suffix)
            .tempfile_in(&dir)
            .map_err(|e| Error::fs(&dir, e))?;
        temp.write_all(&bytes).map_err(|e| Error::fs(temp.path(), e))?;
        temp.as_file().sync_all().map_err(|e| Error::fs(temp.path(), e))?;
        temp.persist(path).map_err(|e| Error::fs(path, e.error))?;

        tracing::debug!(path = %path.display(), projects = file.projects.len(), "persisted build cache");
        Ok(())
    }
}

/// True if `force_rebuild` is set or the force-rebuild environment variable is present.
pub fn should_force_rebuild(config: &ProjectConfig) -> bool {
    config.cache.force_rebuild || std::env::var_os(FORCE_REBUILD_ENV).is_some()
}

fn read_projects(path: &Path) -> Result<BTreeMap<String, CachedProject>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(Error::fs(path, e)),
    };

    match serde_json::from_slice::<CacheFile>(&bytes) {
        Ok(file) if file.version == CACHE_FORMAT_VERSION => Ok(file.projects),
        Ok(file) => {
            tracing::warn!(
                path = %path.display(),
                expected = CACHE_FORMAT_VERSION,
                found = file.version,
                "build cache version mismatch, ignoring it"
            );
            Ok(BTreeMap::new())
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "build cache is corrupt, ignoring it");
            Ok(BTreeMap::new())
        }
    }
}
