//! Shared test utilities for vitrine tests
//!
//! `FakeBundler` stands in for Vite: it writes a fixed manifest and output
//! files into the invocation's output directory and counts its runs.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use vitrine::{Bundler, BundlerInvocation, BundlerOutput, Error, ProjectConfig};

/// Manifest written by [`FakeBundler::vite_like`].
pub const INDEX_MANIFEST: &str = r#"{
  "app/index.html": {
    "file": "assets/index-abc123.js",
    "src": "app/index.html",
    "isEntry": true,
    "css": ["assets/index-def456.css"],
    "imports": ["_shared-0a1b2c.js"]
  },
  "_shared-0a1b2c.js": {
    "file": "assets/shared-0a1b2c.js"
  },
  "script.js": {
    "file": "assets/script-789abc.js",
    "src": "script.js",
    "isEntry": true
  }
}"#;

#[derive(Debug, Default)]
pub struct FakeBundler {
    calls: AtomicUsize,
    manifest: Option<String>,
    files: Vec<(String, String)>,
    failure: Mutex<Option<String>>,
    seen: Mutex<Vec<BundlerInvocation>>,
}

impl FakeBundler {
    /// Writes [`INDEX_MANIFEST`] plus every file it references.
    pub fn vite_like() -> Self {
        Self::with_manifest(INDEX_MANIFEST)
            .file("assets/index-abc123.js", "import './shared-0a1b2c.js';")
            .file("assets/index-def456.css", "body { margin: 0 }")
            .file("assets/shared-0a1b2c.js", "export const shared = 1;")
            .file("assets/script-789abc.js", "console.log('script');")
            .file("robots.txt", "User-agent: *")
    }

    pub fn with_manifest(manifest: &str) -> Self {
        Self {
            manifest: Some(manifest.to_string()),
            ..Self::default()
        }
    }

    /// Exits successfully without writing a manifest.
    pub fn without_manifest() -> Self {
        Self::default().file("assets/index.js", "")
    }

    pub fn file(mut self, path: &str, content: &str) -> Self {
        self.files.push((path.to_string(), content.to_string()));
        self
    }

    /// Make every following run fail with `stderr`.
    pub fn fail_with(&self, stderr: &str) {
        *self.failure.lock().unwrap() = Some(stderr.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_invocation(&self) -> Option<BundlerInvocation> {
        self.seen.lock().unwrap().last().cloned()
    }
}

impl Bundler for FakeBundler {
    fn run(&self, invocation: &BundlerInvocation) -> vitrine::Result<BundlerOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(invocation.clone());

        if let Some(stderr) = self.failure.lock().unwrap().clone() {
            return Err(Error::Build {
                message: "fake bundler failed".to_string(),
                stderr,
                exit_code: Some(1),
            });
        }

        for (path, content) in &self.files {
            write(&invocation.out_dir.join(path), content);
        }
        if let Some(manifest) = &self.manifest {
            write(&invocation.out_dir.join(".vite/manifest.json"), manifest);
        }

        Ok(BundlerOutput {
            out_dir: invocation.out_dir.clone(),
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

/// Write `content` to `path`, creating parent directories.
pub fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// A project with `app/index.html`, `script.js` and a `public/robots.txt`.
pub fn vite_project(root: &Path) -> ProjectConfig {
    write(&root.join("app/index.html"), "<script type=module src=/app/main.js></script>");
    write(&root.join("app/main.js"), "import '../script.js';");
    write(&root.join("script.js"), "console.log('script');");
    write(&root.join("public/robots.txt"), "User-agent: *");
    write(&root.join("package.json"), r#"{"name": "fixture", "private": true}"#);

    ProjectConfig::new(root)
        .with_entries(["app/index.html", "./script.js"])
        .with_alias("bundle", "./script.js")
}
