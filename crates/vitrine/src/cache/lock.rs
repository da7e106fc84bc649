//! Files that live next to a build cache file.
//!
//! A cache file `cache.json` has two kinds of siblings:
//!
//! - `cache.json.lock`, held exclusively while the cache is rewritten
//! - `.cache.json.<random>.tmp`, the staging file renamed over `cache.json`
//!
//! None of them are project sources, so the fingerprint walk skips exactly
//! these names and nothing else in the cache file's directory.

use std::ffi::{OsStr, OsString};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use fs2::FileExt as _;

use crate::{Error, Result};

const LOCK_SUFFIX: &str = ".lock";
const TEMP_SUFFIX: &str = ".tmp";

// `fs2` locks belong to the process on Unix, so two threads persisting at once
// would both get the file lock. They queue here first.
static PERSIST: Mutex<()> = Mutex::new(());

/// Lock file guarding `cache_file`: the same name with `.lock` appended.
pub fn lock_path_for(cache_file: &Path) -> PathBuf {
    let mut name = file_name(cache_file);
    name.push(LOCK_SUFFIX);
    cache_file.with_file_name(name)
}

/// Prefix and suffix of the staging files used to replace `cache_file`.
pub(crate) fn temp_name_parts(cache_file: &Path) -> (OsString, &'static str) {
    let mut prefix = OsString::from(".");
    prefix.push(file_name(cache_file));
    prefix.push(".");
    (prefix, TEMP_SUFFIX)
}

/// True if `path` is `cache_file`, its lock file or one of its staging files.
pub fn is_cache_artifact(cache_file: &Path, path: &Path) -> bool {
    if path == cache_file || path == lock_path_for(cache_file) {
        return true;
    }
    if path.parent() != cache_file.parent() {
        return false;
    }
    let (prefix, suffix) = temp_name_parts(cache_file);
    let (Some(name), Some(prefix)) = (path.file_name().and_then(OsStr::to_str), prefix.to_str())
    else {
        return false;
    };
    name.len() > prefix.len() + suffix.len() && name.starts_with(prefix) && name.ends_with(suffix)
}

/// Exclusive hold on a cache file, across threads and processes.
///
/// Released when dropped.
#[derive(Debug)]
pub struct CacheLock {
    file: File,
    _guard: MutexGuard<'static, ()>,
}

impl CacheLock {
    /// Block until `cache_file` may be rewritten, creating its lock file if needed.
    pub fn acquire(cache_file: &Path) -> Result<Self> {
        let guard = PERSIST.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let path = lock_path_for(cache_file);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::fs(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| Error::fs(&path, e))?;
        file.lock_exclusive()
            .map_err(|e| Error::Cache(format!("failed to lock {}: {}", path.display(), e)))?;

        Ok(Self {
            file,
            _guard: guard,
        })
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn file_name(cache_file: &Path) -> OsString {
    cache_file
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("cache"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_only_its_own_siblings() {
        let cache = Path::new("/p/app/.build-cache.json");

        assert!(is_cache_artifact(cache, cache));
        assert!(is_cache_artifact(cache, Path::new("/p/app/.build-cache.json.lock")));
        assert!(is_cache_artifact(cache, Path::new("/p/app/..build-cache.json.a1B2c3.tmp")));

        assert!(!is_cache_artifact(cache, Path::new("/p/app/main.js")));
        assert!(!is_cache_artifact(cache, Path::new("/p/app/.build-cache.json.tmp")));
        assert!(!is_cache_artifact(cache, Path::new("/p/other/.build-cache.json.lock")));
        assert!(!is_cache_artifact(cache, Path::new("/p/other/..build-cache.json.x.tmp")));
    }

    #[test]
    fn lock_is_reentrant_after_drop() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache = dir.path().join("nested/cache.json");

        drop(CacheLock::acquire(&cache).unwrap());
        let _again = CacheLock::acquire(&cache).unwrap();
        assert!(lock_path_for(&cache).is_file());
    }
}
