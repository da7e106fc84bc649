//! Embedded build output.
//!
//! An [`AssetStore`] owns the bytes of every file the bundler produced, keyed
//! by logical output path. It is built once, either from an output directory
//! on disk or from a packed bundle, and never changes afterwards.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;

use chrono::{DateTime, Utc};
use ignore::WalkBuilder;
use sha2::{Digest, Sha256};

use crate::content_type;
use crate::fingerprint::relative_key;
use crate::manifest::Manifest;
use crate::{Error, Result};

/// Bundler metadata directory inside the output directory; never embedded.
const BUNDLER_META_DIR: &str = ".vite";

/// One embedded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedAsset {
    path: String,
    bytes: Vec<u8>,
    content_type: &'static str,
    hash: String,
    last_modified: Option<u64>,
}

impl EmbeddedAsset {
    pub fn new(path: impl Into<String>, bytes: Vec<u8>, last_modified: Option<u64>) -> Self {
        let path = path.into();
        let hash = content_hash(&bytes);
        Self {
            content_type: content_type::from_path(&path),
            path,
            bytes,
            hash,
            last_modified,
        }
    }

    /// Logical output path, e.g. `assets/index-abc123.js`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    /// SHA-256 of the contents, lowercase hex.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Strong HTTP entity tag derived from the content hash.
    pub fn etag(&self) -> String {
        format!("\"{}\"", self.hash)
    }

    /// Unix timestamp (seconds) of the file's last modification at build time.
    pub fn last_modified(&self) -> Option<u64> {
        self.last_modified
    }

    /// [`Self::last_modified`] as an HTTP date (`Tue, 15 Nov 1994 08:12:31 GMT`).
    pub fn last_modified_http(&self) -> Option<String> {
        let secs = i64::try_from(self.last_modified?).ok()?;
        let time: DateTime<Utc> = DateTime::from_timestamp(secs, 0)?;
        Some(time.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
    }
}

pub(crate) fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Read-only map of logical output path to [`EmbeddedAsset`], plus the manifest
/// that names the entries.
#[derive(Debug, Clone)]
pub struct AssetStore {
    pub(crate) manifest: Manifest,
    pub(crate) assets: BTreeMap<String, EmbeddedAsset>,
}

impl AssetStore {
    /// Embed the build output described by `manifest`.
    ///
    /// Every file the manifest references is read in full. The rest of the
    /// output directory (public-dir copies, HTML pages) is embedded as well,
    /// except the bundler's `.vite/` metadata and the manifest itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Filesystem`] if a referenced file is missing or
    /// unreadable. A dangling reference is never skipped.
    pub fn new(manifest: Manifest) -> Result<Self> {
        let mut assets = BTreeMap::new();

        for output in manifest.output_files() {
            let asset = read_asset(output.absolute(), output.logical())?;
            assets.insert(output.logical().to_string(), asset);
        }

        let output_dir = manifest.output_dir().to_path_buf();
        let walker = WalkBuilder::new(&output_dir)
            .standard_filters(false)
            .follow_links(true)
            .filter_entry(|entry| {
                !(entry.depth() == 1 && entry.file_name() == BUNDLER_META_DIR)
            })
            .build();

        for entry in walker {
            let entry = entry.map_err(|err| {
                let message = err.to_string();
                let source = err
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other(message));
                Error::fs(&output_dir, source)
            })?;
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let Some(logical) = relative_key(&output_dir, entry.path()) else {
                continue;
            };
            if assets.contains_key(&logical) || manifest.source_file() == Some(logical.as_str()) {
                continue;
            }
            let asset = read_asset(entry.path(), &logical)?;
            assets.insert(logical, asset);
        }

        tracing::debug!(
            output_dir = %output_dir.display(),
            entries = manifest.len(),
            assets = assets.len(),
            "embedded build output"
        );

        Ok(Self { manifest, assets })
    }

    /// Assemble a store from already-loaded assets, checking that every file
    /// the manifest references is present.
    pub(crate) fn from_parts(
        manifest: Manifest,
        assets: BTreeMap<String, EmbeddedAsset>,
    ) -> Result<Self> {
        if let Some(missing) = manifest
            .output_files()
            .into_iter()
            .find(|output| !assets.contains_key(output.logical()))
        {
            return Err(Error::Pack(format!(
                "manifest references `{}` but the pack does not contain it",
                missing.logical()
            )));
        }
        Ok(Self { manifest, assets })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Direct file access by logical output path. A single leading `/` is ignored.
    pub fn get(&self, path: &str) -> Option<&EmbeddedAsset> {
        let path = path.strip_prefix('/').unwrap_or(path);
        self.assets.get(path)
    }

    /// All embedded assets, sorted by logical path.
    pub fn iter(&self) -> impl Iterator<Item = &EmbeddedAsset> {
        self.assets.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.assets.keys().map(String::as_str)
    }

    /// Every entry name and alias, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.manifest.names()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

fn read_asset(path: &Path, logical: &str) -> Result<EmbeddedAsset> {
    let bytes = fs::read(path).map_err(|e| Error::fs(path, e))?;
    let last_modified = fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|since| since.as_secs());
    Ok(EmbeddedAsset::new(logical, bytes, last_modified))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_sha256_hex() {
        let asset = EmbeddedAsset::new("hello.txt", b"hello".to_vec(), None);
        assert_eq!(
            asset.hash(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(asset.content_type(), "text/plain; charset=utf-8");
        assert_eq!(asset.etag(), format!("\"{}\"", asset.hash()));
    }

    #[test]
    fn http_date_rendering() {
        let asset = EmbeddedAsset::new("a.js", Vec::new(), Some(784_887_151));
        assert_eq!(
            asset.last_modified_http().as_deref(),
            Some("Tue, 15 Nov 1994 08:12:31 GMT")
        );
        assert!(EmbeddedAsset::new("a.js", Vec::new(), None)
            .last_modified_http()
            .is_none());
    }

    #[test]
    fn store_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AssetStore>();
        assert_send_sync::<EmbeddedAsset>();
    }
}
