use std::path::PathBuf;

use crate::build::bundler::{Bundler, BundlerInvocation};
use crate::build::entries::expand_entries;
use crate::cache::{self, BuildCache, CachedProject};
use crate::fingerprint::{Fingerprint, FingerprintOptions};
use crate::manifest::Manifest;
use crate::{Error, ProjectConfig, Result};

/// Result of [`Orchestrator::build`].
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub manifest: Manifest,
    pub fingerprint: Fingerprint,
    /// Expanded entry set, in declaration order.
    pub entries: Vec<String>,
    /// True if the bundler was skipped because the cached build is still valid.
    pub cache_hit: bool,
}

/// Decides when to run the bundler and turns its output into a [`Manifest`].
#[derive(Debug, Clone, Default)]
pub struct Orchestrator<B> {
    bundler: B,
}

impl<B: Bundler> Orchestrator<B> {
    pub fn new(bundler: B) -> Self {
        Self { bundler }
    }

    pub fn bundler(&self) -> &B {
        &self.bundler
    }

    /// Build `config` unless `cache` already holds a build of the same sources
    /// and entry set whose output files are all still on disk.
    ///
    /// `cache` is updated and persisted only after a fully successful build.
    pub fn ensure_built(&self, config: &ProjectConfig, cache: &mut BuildCache) -> Result<Manifest> {
        self.build(config, cache).map(|outcome| outcome.manifest)
    }

    /// Like [`Self::ensure_built`], reporting whether the cache was hit.
    pub fn build(&self, config: &ProjectConfig, cache: &mut BuildCache) -> Result<BuildOutcome> {
        let config = &config.clone().into_absolute()?;
        config.validate()?;

        let entries = expand_entries(config)?;
        let fingerprint = Fingerprint::compute(&config.root, &FingerprintOptions::for_project(config))?;
        let identity = config.identity();
        let out_dir = config.absolute_out_dir();

        if cache::should_force_rebuild(config) {
            tracing::info!(root = %config.root.display(), "forced rebuild requested");
        } else if let Some(manifest) = cached_manifest(cache, &identity, &fingerprint, &entries, config) {
            tracing::info!(
                root = %config.root.display(),
                fingerprint = %fingerprint,
                "frontend unchanged, reusing previous build"
            );
            return Ok(BuildOutcome {
                manifest,
                fingerprint,
                entries,
                cache_hit: true,
            });
        }

        tracing::info!(
            root = %config.root.display(),
            out_dir = %out_dir.display(),
            entries = entries.len(),
            "building frontend"
        );

        let invocation = BundlerInvocation {
            root: config.root.clone(),
            out_dir: out_dir.clone(),
            public_dir: config.absolute_public_dir(),
            entries: entries.clone(),
            manifest_path: config
                .manifest_path
                .as_ref()
                .map(|p| p.to_string_lossy().replace('\\', "/")),
            command: config.bundler.clone(),
        };
        let output = self.bundler.run(&invocation)?;

        let candidates = config.manifest_candidates();
        let Some(manifest_file) = candidates.iter().find(|path| path.is_file()) else {
            return Err(Error::Build {
                message: format!(
                    "manifest missing: the bundler exited successfully but wrote none of {}",
                    describe(&candidates)
                ),
                stderr: output.stderr,
                exit_code: Some(0),
            });
        };

        let manifest = Manifest::read_from(manifest_file, &out_dir)?;
        for entry in &entries {
            if manifest.get(entry).is_none() {
                return Err(Error::Build {
                    message: format!(
                        "entry `{}` is missing from the bundler manifest {}",
                        entry,
                        manifest_file.display()
                    ),
                    stderr: output.stderr,
                    exit_code: Some(0),
                });
            }
        }
        let manifest = manifest.with_aliases(&config.normalized_aliases())?;

        cache.insert(identity, CachedProject::new(&fingerprint, &entries, &manifest));
        cache.persist()?;

        tracing::info!(
            entries = manifest.len(),
            files = manifest.output_files().len(),
            "frontend build complete"
        );

        Ok(BuildOutcome {
            manifest,
            fingerprint,
            entries,
            cache_hit: false,
        })
    }
}

fn cached_manifest(
    cache: &BuildCache,
    identity: &str,
    fingerprint: &Fingerprint,
    entries: &[String],
    config: &ProjectConfig,
) -> Option<Manifest> {
    let cached = cache.get(identity)?;
    if !cached.matches(fingerprint, entries) {
        tracing::debug!(identity, "build cache miss: sources or entries changed");
        return None;
    }

    let manifest = match Manifest::from_snapshot(&cached.manifest, &config.absolute_out_dir()) {
        Ok(manifest) => manifest,
        Err(err) => {
            tracing::warn!(identity, error = %err, "discarding unreadable cached manifest");
            return None;
        }
    };

    if let Some(missing) = manifest
        .output_files()
        .into_iter()
        .find(|output| !output.absolute().is_file())
    {
        tracing::debug!(
            identity,
            missing = %missing.absolute().display(),
            "build cache miss: output file is gone"
        );
        return None;
    }

    Some(manifest)
}

fn describe(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
