//! Packed asset bundles.
//!
//! A pack is the byte form of an [`AssetStore`], written at build time and
//! embedded in the host with `include_bytes!`. Layout: the magic `VTRNPACK`,
//! a little-endian `u32` format version, then a `bincode` body.
//!
//! The body records the output directory by its final name only (`dist`),
//! so no path from the build machine ends up in the host binary.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::manifest::{Manifest, ManifestSnapshot};
use crate::store::{AssetStore, EmbeddedAsset, content_hash};
use crate::{Error, Result};

const PACK_MAGIC: &[u8; 8] = b"VTRNPACK";

/// Current pack format version. Increment when the body layout changes.
pub const PACK_FORMAT_VERSION: u32 = 2;

/// Output directory name used when the packed store had none.
const FALLBACK_OUTPUT_DIR: &str = "dist";

const HEADER_LEN: usize = PACK_MAGIC.len() + 4;

#[derive(Serialize, Deserialize)]
struct PackBody {
    vitrine_version: String,
    output_dir_name: String,
    manifest: ManifestSnapshot,
    assets: Vec<PackedAsset>,
}

#[derive(Serialize, Deserialize)]
struct PackedAsset {
    path: String,
    bytes: Vec<u8>,
    hash: String,
    last_modified: Option<u64>,
}

impl AssetStore {
    /// Serialize the store into a pack.
    pub fn pack(&self) -> Result<Vec<u8>> {
        let body = PackBody {
            vitrine_version: env!("CARGO_PKG_VERSION").to_string(),
            output_dir_name: self
                .manifest
                .output_dir()
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| FALLBACK_OUTPUT_DIR.to_string()),
            manifest: self.manifest.snapshot(),
            assets: self
                .assets
                .values()
                .map(|asset| PackedAsset {
                    path: asset.path().to_string(),
                    bytes: asset.bytes().to_vec(),
                    hash: asset.hash().to_string(),
                    last_modified: asset.last_modified(),
                })
                .collect(),
        };

        let encoded = bincode::serialize(&body)
            .map_err(|e| Error::Pack(format!("failed to encode pack: {}", e)))?;

        let mut out = Vec::with_capacity(HEADER_LEN + encoded.len());
        out.extend_from_slice(PACK_MAGIC);
        out.extend_from_slice(&PACK_FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&encoded);
        Ok(out)
    }

    /// Rebuild a store from a pack produced by [`AssetStore::pack`].
    ///
    /// The unpacked manifest's output directory is the relative path
    /// `<output dir name>`, since the original location is not recorded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Pack`] for a foreign or truncated pack, a format
    /// version mismatch, a content hash that does not match its bytes, or a
    /// manifest referencing a file the pack lacks.
    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN || &bytes[..PACK_MAGIC.len()] != PACK_MAGIC {
            return Err(Error::Pack("not a vitrine asset pack".to_string()));
        }

        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[PACK_MAGIC.len()..HEADER_LEN]);
        let version = u32::from_le_bytes(version);
        if version != PACK_FORMAT_VERSION {
            return Err(Error::Pack(format!(
                "pack format version mismatch: expected {}, found {}",
                PACK_FORMAT_VERSION, version
            )));
        }

        let body: PackBody = bincode::deserialize(&bytes[HEADER_LEN..])
            .map_err(|e| Error::Pack(format!("corrupt pack body: {}", e)))?;

        let manifest = Manifest::from_snapshot(&body.manifest, &PathBuf::from(&body.output_dir_name))
            .map_err(|e| Error::Pack(format!("invalid manifest in pack: {}", e)))?;

        let mut assets = BTreeMap::new();
        for packed in body.assets {
            let asset = EmbeddedAsset::new(packed.path, packed.bytes, packed.last_modified);
            if asset.hash() != packed.hash {
                return Err(Error::Pack(format!(
                    "content hash mismatch for `{}`",
                    asset.path()
                )));
            }
            assets.insert(asset.path().to_string(), asset);
        }

        tracing::debug!(
            version = %body.vitrine_version,
            assets = assets.len(),
            "unpacked asset store"
        );
        AssetStore::from_parts(manifest, assets)
    }
}

/// SHA-256 of a pack, for cache-busting the embedded file.
pub fn pack_digest(pack: &[u8]) -> String {
    content_hash(pack)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_foreign_bytes() {
        assert!(matches!(AssetStore::unpack(b"hello"), Err(Error::Pack(_))));
        assert!(matches!(
            AssetStore::unpack(b"PK\x03\x04 not a vitrine pack"),
            Err(Error::Pack(_))
        ));
    }

    fn sample_store(dir: &std::path::Path) -> AssetStore {
        let out_dir = dir.join("web/dist");
        std::fs::create_dir_all(out_dir.join("assets")).unwrap();
        std::fs::write(out_dir.join("assets/main-1.js"), "main()").unwrap();
        std::fs::write(out_dir.join("assets/chunk-2.js"), "chunk()").unwrap();
        let manifest = Manifest::parse(
            br#"{
                "main.js": {"file": "assets/main-1.js", "isEntry": true, "imports": ["_chunk.js"]},
                "_chunk.js": {"file": "assets/chunk-2.js"}
            }"#,
            &out_dir,
        )
        .unwrap();
        AssetStore::new(manifest).unwrap()
    }

    #[test]
    fn chunks_without_optional_fields_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = sample_store(dir.path());

        let unpacked = AssetStore::unpack(&store.pack().unwrap()).unwrap();
        assert_eq!(unpacked.manifest().snapshot(), store.manifest().snapshot());
        assert_eq!(
            unpacked.resolve("main.js").unwrap().import_files(),
            vec!["assets/chunk-2.js"]
        );
    }

    #[test]
    fn build_machine_paths_stay_out_of_the_pack() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = sample_store(dir.path());
        let pack = store.pack().unwrap();

        let host_path = dir.path().to_string_lossy().into_owned();
        assert!(
            !pack
                .windows(host_path.len())
                .any(|window| window == host_path.as_bytes())
        );
        let unpacked = AssetStore::unpack(&pack).unwrap();
        assert_eq!(unpacked.manifest().output_dir(), std::path::Path::new("dist"));
    }

    #[test]
    fn rejects_other_versions() {
        let mut bytes = PACK_MAGIC.to_vec();
        bytes.extend_from_slice(&(PACK_FORMAT_VERSION + 1).to_le_bytes());
        let err = AssetStore::unpack(&bytes).unwrap_err();
        assert!(err.to_string().contains("version mismatch"), "{err}");
    }
}
