//! Helpers for calling vitrine from a host crate's `build.rs`.
//!
//! ```no_run
//! // build.rs
//! fn main() -> vitrine::Result<()> {
//!     let config = vitrine::ConfigDiscovery::new("frontend").load()?;
//!     vitrine::build_script::embed(&config, "assets.vitrine")?;
//!     Ok(())
//! }
//! ```
//!
//! The host then embeds `concat!(env!("OUT_DIR"), "/assets.vitrine")` with
//! `include_bytes!` and calls [`AssetStore::unpack`].

use std::fs;
use std::path::{Path, PathBuf};

use vitrine_config::ConfigError;

use crate::build::Orchestrator;
use crate::cache::{BuildCache, FORCE_REBUILD_ENV};
use crate::pack::pack_digest;
use crate::{AssetStore, Error, Fingerprint, ProcessBundler, ProjectConfig, Result};

/// Environment variables that change the build when set.
const WATCHED_ENV: &[&str] = &[
    FORCE_REBUILD_ENV,
    "VITRINE_OUT_DIR",
    "VITRINE_PUBLIC_DIR",
    "VITRINE_MANIFEST_PATH",
];

/// What [`embed`] produced.
#[derive(Debug)]
pub struct Embedded {
    pub pack_path: PathBuf,
    /// SHA-256 of the pack.
    pub digest: String,
    pub store: AssetStore,
    pub cache_hit: bool,
}

/// Build `config`, write the pack to `$OUT_DIR/<file_name>` and print the
/// `cargo:rerun-if-changed` directives for every tracked frontend file.
pub fn embed(config: &ProjectConfig, file_name: &str) -> Result<Embedded> {
    let out_dir = std::env::var_os("OUT_DIR").ok_or_else(|| {
        Error::Config(ConfigError::InvalidValue {
            field: "OUT_DIR".to_string(),
            message: "not set; embed() must run inside a build script".to_string(),
        })
    })?;
    let pack_path = PathBuf::from(out_dir).join(file_name);

    let (embedded, fingerprint) = embed_to(config, &pack_path)?;
    let config = config.clone().into_absolute()?;
    for directive in rerun_directives(&config, &fingerprint) {
        println!("{}", directive);
    }
    Ok(embedded)
}

/// Build `config` and write its pack to `pack_path`, without printing anything.
pub fn embed_to(config: &ProjectConfig, pack_path: &Path) -> Result<(Embedded, Fingerprint)> {
    let mut cache = BuildCache::open(config)?;
    let outcome = Orchestrator::new(ProcessBundler::new()).build(config, &mut cache)?;
    let store = AssetStore::new(outcome.manifest)?;
    let pack = store.pack()?;

    if let Some(parent) = pack_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::fs(parent, e))?;
    }
    fs::write(pack_path, &pack).map_err(|e| Error::fs(pack_path, e))?;

    let embedded = Embedded {
        pack_path: pack_path.to_path_buf(),
        digest: pack_digest(&pack),
        store,
        cache_hit: outcome.cache_hit,
    };
    Ok((embedded, outcome.fingerprint))
}

/// Cargo directives that rerun the build script when the frontend changes.
pub fn rerun_directives(config: &ProjectConfig, fingerprint: &Fingerprint) -> Vec<String> {
    let mut directives: Vec<String> = fingerprint
        .tracked_files()
        .iter()
        .map(|relative| {
            format!(
                "cargo:rerun-if-changed={}",
                config.root.join(relative).display()
            )
        })
        .collect();

    for descriptor in ["vitrine.toml", "package.json"] {
        let path = config.root.join(descriptor);
        let directive = format!("cargo:rerun-if-changed={}", path.display());
        if !directives.contains(&directive) {
            directives.push(directive);
        }
    }

    directives.extend(
        WATCHED_ENV
            .iter()
            .map(|var| format!("cargo:rerun-if-env-changed={}", var)),
    );
    directives
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FingerprintOptions;
    use tempfile::TempDir;

    #[test]
    fn directives_cover_tracked_files_and_env() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.ts"), "").unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();

        let config = ProjectConfig::new(dir.path()).with_entry("src/main.ts");
        let fingerprint =
            Fingerprint::compute(dir.path(), &FingerprintOptions::for_project(&config)).unwrap();
        let directives = rerun_directives(&config, &fingerprint);

        let main = format!(
            "cargo:rerun-if-changed={}",
            dir.path().join("src/main.ts").display()
        );
        let package_json = format!(
            "cargo:rerun-if-changed={}",
            dir.path().join("package.json").display()
        );
        assert!(directives.contains(&main));
        assert_eq!(
            directives.iter().filter(|d| **d == package_json).count(),
            1
        );
        assert!(directives.contains(&"cargo:rerun-if-env-changed=VITRINE_FORCE_REBUILD".to_string()));
    }
}
