//! The bundler seam: what the orchestrator asks of an external bundler, and
//! the subprocess implementation that runs Vite.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use vitrine_config::BundlerCommand;

use crate::{Error, Result};

/// Environment variable carrying the expanded entries, one per line.
pub const ENTRIES_ENV: &str = "VITRINE_ENTRIES";

/// Environment variable carrying the absolute output directory.
pub const OUT_DIR_ENV: &str = "VITRINE_OUT_DIR";

/// Environment variable carrying the absolute public asset directory.
pub const PUBLIC_DIR_ENV: &str = "VITRINE_PUBLIC_DIR";

/// One bundler run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlerInvocation {
    /// Project root; the bundler's working directory.
    pub root: PathBuf,
    /// Absolute output directory.
    pub out_dir: PathBuf,
    /// Absolute public asset directory, copied verbatim into `out_dir` by Vite.
    pub public_dir: PathBuf,
    /// Expanded entry inputs, root-relative.
    pub entries: Vec<String>,
    /// Manifest location relative to `out_dir`, when configured explicitly.
    pub manifest_path: Option<String>,
    /// Explicit command line; `None` runs Vite through the detected package manager.
    pub command: Option<BundlerCommand>,
}

/// What a successful run reports back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundlerOutput {
    pub out_dir: PathBuf,
    pub stdout: String,
    pub stderr: String,
}

/// Something that can build a frontend project into an output directory.
pub trait Bundler {
    /// Run the bundler to completion.
    ///
    /// A failed run returns [`Error::Build`] carrying the tool's stderr.
    fn run(&self, invocation: &BundlerInvocation) -> Result<BundlerOutput>;
}

impl<B: Bundler + ?Sized> Bundler for &B {
    fn run(&self, invocation: &BundlerInvocation) -> Result<BundlerOutput> {
        (**self).run(invocation)
    }
}

/// Supported package managers for running Vite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Pnpm,
    Npm,
    Yarn,
    Bun,
    Deno,
}

impl PackageManager {
    /// Detect the package manager from package.json and lockfiles
    ///
    /// Priority: packageManager field > lockfiles > npm
    pub fn detect(project_root: &Path) -> Self {
        let package_json_path = project_root.join("package.json");

        // packageManager field (Corepack standard)
        if let Ok(content) = std::fs::read_to_string(&package_json_path) {
            if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&content) {
                if let Some(pm) = parsed.get("packageManager").and_then(|v| v.as_str()) {
                    if pm.starts_with("pnpm") {
                        return Self::Pnpm;
                    } else if pm.starts_with("yarn") {
                        return Self::Yarn;
                    } else if pm.starts_with("bun") {
                        return Self::Bun;
                    } else if pm.starts_with("npm") {
                        return Self::Npm;
                    }
                }
            }
        }

        if project_root.join("pnpm-lock.yaml").exists() {
            return Self::Pnpm;
        }
        if project_root.join("bun.lockb").exists() || project_root.join("bun.lock").exists() {
            return Self::Bun;
        }
        if project_root.join("deno.lock").exists() {
            return Self::Deno;
        }
        if project_root.join("yarn.lock").exists() {
            return Self::Yarn;
        }

        Self::Npm
    }

    /// Command prefix that runs the project-local Vite binary.
    pub fn vite_command(&self) -> Vec<&'static str> {
        match self {
            Self::Pnpm => vec!["pnpm", "exec", "vite"],
            Self::Npm => vec!["npx", "--no-install", "vite"],
            Self::Yarn => vec!["yarn", "vite"],
            Self::Bun => vec!["bunx", "vite"],
            Self::Deno => vec!["deno", "run", "-A", "npm:vite"],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pnpm => "pnpm",
            Self::Npm => "npm",
            Self::Yarn => "yarn",
            Self::Bun => "bun",
            Self::Deno => "deno",
        }
    }
}

/// Runs the bundler as a blocking subprocess.
///
/// With no explicit command, runs
///
/// ```text
/// vite build --outDir {out_dir} --publicDir {public_dir} --manifest --emptyOutDir
///     --rollupOptions.input <entry> [--rollupOptions.input <entry> ...]
/// ```
///
/// through the project's package manager. Vite merges the dotted
/// `rollupOptions.input` flags into `build.rollupOptions.input`, so the
/// project's `vite.config` needs no knowledge of vitrine.
///
/// An explicit command may use the `{out_dir}`, `{public_dir}`, `{manifest}`
/// and `{entries}` placeholders; `{entries}` must stand alone and expands to one
/// argument per entry. Every command also sees the expanded entries in
/// `VITRINE_ENTRIES` (newline-separated), the output directory in
/// `VITRINE_OUT_DIR` and the public directory in `VITRINE_PUBLIC_DIR`.
#[derive(Debug, Clone, Default)]
pub struct ProcessBundler {
    package_manager: Option<PackageManager>,
}

impl ProcessBundler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `package_manager` instead of detecting one.
    pub fn with_package_manager(mut self, package_manager: PackageManager) -> Self {
        self.package_manager = Some(package_manager);
        self
    }

    /// The full command line for `invocation`, placeholders expanded.
    pub fn command_line(&self, invocation: &BundlerInvocation) -> Result<Vec<String>> {
        let template: Vec<String> = match &invocation.command {
            Some(command) => {
                if command.program().is_none_or(|p| p.trim().is_empty()) {
                    return Err(Error::build("bundler command is empty"));
                }
                command.command.clone()
            }
            None => {
                let pm = self
                    .package_manager
                    .unwrap_or_else(|| PackageManager::detect(&invocation.root));
                let mut parts: Vec<String> =
                    pm.vite_command().into_iter().map(String::from).collect();
                parts.extend(
                    ["build", "--outDir", "{out_dir}", "--publicDir", "{public_dir}", "--manifest"]
                        .map(String::from),
                );
                if invocation.manifest_path.is_some() {
                    parts.push("{manifest}".to_string());
                }
                parts.push("--emptyOutDir".to_string());
                for entry in &invocation.entries {
                    parts.push("--rollupOptions.input".to_string());
                    parts.push(entry.clone());
                }
                parts
            }
        };

        let out_dir = invocation.out_dir.to_string_lossy();
        let public_dir = invocation.public_dir.to_string_lossy();
        let manifest = invocation.manifest_path.as_deref().unwrap_or("");

        let mut expanded = Vec::with_capacity(template.len());
        for arg in template {
            if arg == "{entries}" {
                expanded.extend(invocation.entries.iter().cloned());
            } else {
                expanded.push(
                    arg.replace("{out_dir}", &out_dir)
                        .replace("{public_dir}", &public_dir)
                        .replace("{manifest}", manifest),
                );
            }
        }
        Ok(expanded)
    }
}

impl Bundler for ProcessBundler {
    fn run(&self, invocation: &BundlerInvocation) -> Result<BundlerOutput> {
        let command_line = self.command_line(invocation)?;
        let (program, args) = command_line
            .split_first()
            .ok_or_else(|| Error::build("bundler command is empty"))?;
        let rendered = command_line.join(" ");

        tracing::info!(command = %rendered, root = %invocation.root.display(), "running bundler");

        let output = Command::new(program_name(program))
            .args(args)
            .current_dir(&invocation.root)
            .env(ENTRIES_ENV, invocation.entries.join("\n"))
            .env(OUT_DIR_ENV, &invocation.out_dir)
            .env(PUBLIC_DIR_ENV, &invocation.public_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| Error::Build {
                message: format!("failed to start `{}`: {}", program, e),
                stderr: String::new(),
                exit_code: None,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        for line in stdout.lines() {
            tracing::debug!(target: "vitrine::bundler", "{}", line);
        }

        if !output.status.success() {
            return Err(Error::Build {
                message: format!("`{}` exited with {}", rendered, output.status),
                stderr,
                exit_code: output.status.code(),
            });
        }

        Ok(BundlerOutput {
            out_dir: invocation.out_dir.clone(),
            stdout,
            stderr,
        })
    }
}

/// Node tooling ships `.cmd` shims on Windows.
fn program_name(program: &str) -> String {
    if cfg!(windows) && matches!(program, "npm" | "npx" | "pnpm" | "yarn" | "bunx") {
        format!("{}.cmd", program)
    } else {
        program.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn invocation(root: &Path) -> BundlerInvocation {
        BundlerInvocation {
            root: root.to_path_buf(),
            out_dir: root.join("dist"),
            public_dir: root.join("public"),
            entries: vec!["app/index.html".to_string(), "script.js".to_string()],
            manifest_path: None,
            command: None,
        }
    }

    #[test]
    fn detects_from_package_manager_field() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"packageManager": "pnpm@9.1.0"}"#,
        )
        .unwrap();
        fs::write(dir.path().join("package-lock.json"), "{}").unwrap();
        assert_eq!(PackageManager::detect(dir.path()), PackageManager::Pnpm);
    }

    #[test]
    fn detects_from_lockfiles() {
        let dir = TempDir::new().unwrap();
        assert_eq!(PackageManager::detect(dir.path()), PackageManager::Npm);

        fs::write(dir.path().join("yarn.lock"), "").unwrap();
        assert_eq!(PackageManager::detect(dir.path()), PackageManager::Yarn);

        fs::write(dir.path().join("bun.lock"), "").unwrap();
        assert_eq!(PackageManager::detect(dir.path()), PackageManager::Bun);

        fs::write(dir.path().join("pnpm-lock.yaml"), "").unwrap();
        assert_eq!(PackageManager::detect(dir.path()), PackageManager::Pnpm);
    }

    #[test]
    fn default_command_runs_vite_build() {
        let dir = TempDir::new().unwrap();
        let bundler = ProcessBundler::new().with_package_manager(PackageManager::Pnpm);
        let out_dir = dir.path().join("dist").to_string_lossy().into_owned();
        let public_dir = dir.path().join("public").to_string_lossy().into_owned();

        assert_eq!(
            bundler.command_line(&invocation(dir.path())).unwrap(),
            vec![
                "pnpm",
                "exec",
                "vite",
                "build",
                "--outDir",
                out_dir.as_str(),
                "--publicDir",
                public_dir.as_str(),
                "--manifest",
                "--emptyOutDir",
                "--rollupOptions.input",
                "app/index.html",
                "--rollupOptions.input",
                "script.js",
            ]
        );
    }

    #[test]
    fn default_command_passes_custom_manifest() {
        let dir = TempDir::new().unwrap();
        let bundler = ProcessBundler::new().with_package_manager(PackageManager::Npm);
        let mut inv = invocation(dir.path());
        inv.manifest_path = Some("meta/manifest.json".to_string());

        let line = bundler.command_line(&inv).unwrap();
        let at = line.iter().position(|a| a == "--manifest").unwrap();
        assert_eq!(line[at + 1], "meta/manifest.json");
        assert_eq!(&line[..3], ["npx", "--no-install", "vite"]);
    }

    #[test]
    fn explicit_command_expands_placeholders() {
        let dir = TempDir::new().unwrap();
        let mut inv = invocation(dir.path());
        inv.command = Some(BundlerCommand::new([
            "node",
            "build.mjs",
            "--out={out_dir}",
            "--static={public_dir}",
            "{entries}",
        ]));

        let line = ProcessBundler::new().command_line(&inv).unwrap();
        assert_eq!(
            line,
            vec![
                "node".to_string(),
                "build.mjs".to_string(),
                format!("--out={}", dir.path().join("dist").display()),
                format!("--static={}", dir.path().join("public").display()),
                "app/index.html".to_string(),
                "script.js".to_string(),
            ]
        );
    }

    #[test]
    fn empty_explicit_command_is_build_error() {
        let dir = TempDir::new().unwrap();
        let mut inv = invocation(dir.path());
        inv.command = Some(BundlerCommand::default());
        assert!(matches!(
            ProcessBundler::new().command_line(&inv),
            Err(Error::Build { .. })
        ));
    }
}
