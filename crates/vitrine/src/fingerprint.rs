//! Content fingerprint of a frontend source tree.
//!
//! The fingerprint decides whether a rebuild is required. It is a BLAKE3
//! digest over the sorted, `/`-separated relative path of every tracked file
//! and the BLAKE3 hash of that file's contents. Absolute paths and timestamps
//! never enter the digest, so the same tree checked out in two places yields
//! the same fingerprint.
//!
//! Symbolic links are followed, as Vite resolves through them. A link is
//! tracked under its own path with its target's contents, and a link that
//! loops back into an ancestor directory is skipped.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use blake3::Hasher;
use ignore::WalkBuilder;
use ignore::overrides::{Override, OverrideBuilder};
use path_clean::PathClean;

use crate::cache::is_cache_artifact;
use crate::{Error, ProjectConfig, Result};

/// Current fingerprint format version. Increment when the digest layout changes.
const FINGERPRINT_FORMAT_VERSION: u32 = 1;

/// Directory names skipped at any depth.
const ALWAYS_SKIPPED_DIRS: &[&str] = &["node_modules", ".git"];

/// What to track when fingerprinting a root.
#[derive(Debug, Clone, Default)]
pub struct FingerprintOptions {
    /// Root-relative globs. When non-empty only matching files are tracked.
    pub include: Vec<String>,

    /// Root-relative globs removed from the tracked set.
    pub exclude: Vec<String>,

    /// Files or directories skipped outright, such as the output directory.
    pub skip_paths: Vec<PathBuf>,

    /// Build cache file whose lock and staging siblings are skipped along with it.
    pub cache_file: Option<PathBuf>,
}

impl FingerprintOptions {
    /// Options for a project: its include/exclude globs, output directory and cache files.
    ///
    /// The default cache directory (`.vitrine/`) belongs to vitrine and is
    /// skipped whole. A custom cache path may sit among sources, so only the
    /// cache file and its siblings are skipped there.
    pub fn for_project(config: &ProjectConfig) -> Self {
        let cache_file = config.cache_file();
        let mut skip_paths = vec![config.absolute_out_dir()];
        if config.cache.path.is_none() {
            if let Some(parent) = cache_file.parent().filter(|p| *p != config.root.clean()) {
                skip_paths.push(parent.to_path_buf());
            }
        }

        Self {
            include: config.fingerprint.include.clone(),
            exclude: config.fingerprint.exclude.clone(),
            skip_paths,
            cache_file: Some(cache_file),
        }
    }

    pub fn with_include(mut self, pattern: impl Into<String>) -> Self {
        self.include.push(pattern.into());
        self
    }

    pub fn with_exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude.push(pattern.into());
        self
    }

    pub fn skip_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.skip_paths.push(path.into());
        self
    }

    pub fn with_cache_file(mut self, cache_file: impl Into<PathBuf>) -> Self {
        self.cache_file = Some(cache_file.into());
        self
    }
}

/// Opaque digest of a source tree.
///
/// Two fingerprints compare equal exactly when they have the same digest.
#[derive(Debug, Clone)]
pub struct Fingerprint {
    digest: String,
    files: Vec<String>,
}

impl Fingerprint {
    /// Fingerprint every tracked file under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Filesystem`] if `root` is missing, is not a directory,
    /// or a tracked file cannot be read.
    pub fn compute(root: &Path, options: &FingerprintOptions) -> Result<Self> {
        let metadata = fs::metadata(root).map_err(|e| Error::fs(root, e))?;
        if !metadata.is_dir() {
            return Err(Error::fs(
                root,
                io::Error::new(io::ErrorKind::NotADirectory, "project root is not a directory"),
            ));
        }

        let root = root.to_path_buf().clean();
        let overrides = build_overrides(&root, options)?;
        let skip_paths: Vec<PathBuf> = options
            .skip_paths
            .iter()
            .map(|path| if path.is_absolute() { path.clean() } else { root.join(path).clean() })
            .collect();
        let cache_file = options
            .cache_file
            .as_ref()
            .map(|path| if path.is_absolute() { path.clean() } else { root.join(path).clean() });

        let mut walker = WalkBuilder::new(&root);
        walker
            .standard_filters(false)
            .follow_links(true)
            .overrides(overrides)
            .filter_entry(move |entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
                if is_dir
                    && entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| ALWAYS_SKIPPED_DIRS.contains(&name))
                {
                    return false;
                }
                if cache_file
                    .as_deref()
                    .is_some_and(|cache| is_cache_artifact(cache, entry.path()))
                {
                    return false;
                }
                !skip_paths.iter().any(|skip| skip == entry.path())
            });

        let mut files = Vec::new();
        for entry in walker.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if is_loop(&err) => {
                    tracing::debug!(error = %err, "skipping symlink loop");
                    continue;
                }
                Err(err) => return Err(walk_error(&root, err)),
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            if let Some(relative) = relative_key(&root, entry.path()) {
                files.push((relative, entry.into_path()));
            }
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));

        let mut hasher = Hasher::new();
        hasher.update(&FINGERPRINT_FORMAT_VERSION.to_le_bytes());
        for (relative, path) in &files {
            let content = fs::read(path).map_err(|e| Error::fs(path, e))?;
            hasher.update(relative.as_bytes());
            hasher.update(b"\0");
            hasher.update(blake3::hash(&content).as_bytes());
        }

        let fingerprint = Self {
            digest: hasher.finalize().to_hex().to_string(),
            files: files.into_iter().map(|(relative, _)| relative).collect(),
        };
        tracing::debug!(
            root = %root.display(),
            files = fingerprint.files.len(),
            fingerprint = %fingerprint.digest,
            "computed source fingerprint"
        );
        Ok(fingerprint)
    }

    /// Rebuild a fingerprint from a stored digest. It carries no file list.
    pub fn from_hex(digest: impl Into<String>) -> Self {
        Self {
            digest: digest.into(),
            files: Vec::new(),
        }
    }

    pub fn hex(&self) -> &str {
        &self.digest
    }

    /// Root-relative paths of the files that went into the digest, sorted.
    pub fn tracked_files(&self) -> &[String] {
        &self.files
    }
}

impl PartialEq for Fingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest
    }
}

impl Eq for Fingerprint {}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.digest)
    }
}

fn build_overrides(root: &Path, options: &FingerprintOptions) -> Result<Override> {
    let mut builder = OverrideBuilder::new(root);
    for pattern in &options.include {
        builder.add(pattern).map_err(|e| invalid_glob(pattern, e))?;
    }
    for pattern in &options.exclude {
        let negated = format!("!{}", pattern);
        builder.add(&negated).map_err(|e| invalid_glob(pattern, e))?;
    }
    builder.build().map_err(|e| invalid_glob("fingerprint", e))
}

fn invalid_glob(pattern: &str, err: ignore::Error) -> Error {
    Error::Config(vitrine_config::ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        message: err.to_string(),
    })
}

fn is_loop(err: &ignore::Error) -> bool {
    match err {
        ignore::Error::Loop { .. } => true,
        ignore::Error::WithPath { err, .. } | ignore::Error::WithDepth { err, .. } => is_loop(err),
        _ => false,
    }
}

fn walk_error(root: &Path, err: ignore::Error) -> Error {
    let message = err.to_string();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other(message));
    Error::fs(root, source)
}

/// `/`-separated path of `path` relative to `root`.
pub(crate) fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn sample_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "index.html", "<script type=module src=./main.ts></script>");
        write(dir.path(), "src/main.ts", "console.log('hi')");
        write(dir.path(), "src/style.css", "body { margin: 0 }");
        dir
    }

    fn compute(root: &Path) -> Fingerprint {
        Fingerprint::compute(root, &FingerprintOptions::default()).unwrap()
    }

    #[test]
    fn deterministic_on_unmodified_tree() {
        let dir = sample_tree();
        assert_eq!(compute(dir.path()), compute(dir.path()));
    }

    #[test]
    fn content_change_changes_digest() {
        let dir = sample_tree();
        let before = compute(dir.path());
        write(dir.path(), "src/main.ts", "console.log('bye')");
        assert_ne!(before, compute(dir.path()));
    }

    #[test]
    fn adding_and_removing_files_changes_digest() {
        let dir = sample_tree();
        let before = compute(dir.path());

        write(dir.path(), "src/extra.ts", "");
        let added = compute(dir.path());
        assert_ne!(before, added);

        fs::remove_file(dir.path().join("src/extra.ts")).unwrap();
        assert_eq!(before, compute(dir.path()));
    }

    #[test]
    fn renaming_a_file_changes_digest() {
        let dir = sample_tree();
        let before = compute(dir.path());
        fs::rename(
            dir.path().join("src/style.css"),
            dir.path().join("src/theme.css"),
        )
        .unwrap();
        assert_ne!(before, compute(dir.path()));
    }

    #[test]
    fn independent_of_absolute_location() {
        let a = sample_tree();
        let b = sample_tree();
        assert_ne!(a.path(), b.path());
        assert_eq!(compute(a.path()), compute(b.path()));
    }

    #[test]
    fn skipped_directories_do_not_count() {
        let dir = sample_tree();
        let options = FingerprintOptions::default().skip_path("dist");
        let before = Fingerprint::compute(dir.path(), &options).unwrap();

        write(dir.path(), "dist/assets/main-abc123.js", "built");
        write(dir.path(), "node_modules/vite/index.js", "module.exports = {}");
        write(dir.path(), ".git/HEAD", "ref: refs/heads/main");

        let after = Fingerprint::compute(dir.path(), &options).unwrap();
        assert_eq!(before, after);
        assert_eq!(
            after.tracked_files(),
            ["index.html", "src/main.ts", "src/style.css"]
        );
    }

    #[test]
    fn include_and_exclude_globs_narrow_the_set() {
        let dir = sample_tree();
        write(dir.path(), "src/main.test.ts", "test()");
        let options = FingerprintOptions::default()
            .with_include("src/**")
            .with_exclude("**/*.test.ts");

        let fingerprint = Fingerprint::compute(dir.path(), &options).unwrap();
        assert_eq!(fingerprint.tracked_files(), ["src/main.ts", "src/style.css"]);

        write(dir.path(), "index.html", "changed outside the include set");
        write(dir.path(), "src/main.test.ts", "changed but excluded");
        assert_eq!(fingerprint, Fingerprint::compute(dir.path(), &options).unwrap());
    }

    #[test]
    fn missing_root_is_filesystem_error() {
        let dir = TempDir::new().unwrap();
        let err = Fingerprint::compute(&dir.path().join("nope"), &FingerprintOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Filesystem { .. }));
    }

    #[test]
    fn project_options_skip_output_and_cache() {
        let dir = sample_tree();
        let config = ProjectConfig::new(dir.path())
            .with_entry("index.html")
            .with_out_dir("custom-output-dir/dist");
        let options = FingerprintOptions::for_project(&config);
        let before = Fingerprint::compute(dir.path(), &options).unwrap();

        write(dir.path(), "custom-output-dir/dist/index.html", "built");
        write(dir.path(), ".vitrine/cache.json", "{}");

        assert_eq!(before, Fingerprint::compute(dir.path(), &options).unwrap());
    }

    #[test]
    fn custom_cache_path_skips_only_cache_files() {
        let dir = sample_tree();
        let config = ProjectConfig::new(dir.path())
            .with_entry("index.html")
            .with_cache(vitrine_config::CacheSettings {
                path: Some(PathBuf::from("src/.build-cache.json")),
                ..Default::default()
            });
        let options = FingerprintOptions::for_project(&config);
        let before = Fingerprint::compute(dir.path(), &options).unwrap();
        assert_eq!(
            before.tracked_files(),
            ["index.html", "src/main.ts", "src/style.css"]
        );

        write(dir.path(), "src/.build-cache.json", "{}");
        write(dir.path(), "src/.build-cache.json.lock", "");
        write(dir.path(), "src/..build-cache.json.Xy12ab.tmp", "{}");
        assert_eq!(before, Fingerprint::compute(dir.path(), &options).unwrap());

        write(dir.path(), "src/main.ts", "console.log('edited')");
        assert_ne!(before, Fingerprint::compute(dir.path(), &options).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn follows_symlinked_sources() {
        let dir = sample_tree();
        let shared = TempDir::new().unwrap();
        write(shared.path(), "theme.css", "body { color: red }");
        std::os::unix::fs::symlink(shared.path().join("theme.css"), dir.path().join("src/theme.css"))
            .unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("src/loop")).unwrap();

        let before = compute(dir.path());
        assert!(before.tracked_files().contains(&"src/theme.css".to_string()));

        write(shared.path(), "theme.css", "body { color: blue }");
        assert_ne!(before, compute(dir.path()));
    }
}
