//! End-to-end tests for the `vitrine` binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn vitrine() -> Command {
    let mut cmd = Command::cargo_bin("vitrine").unwrap();
    cmd.env("NO_COLOR", "1")
        .env_remove("FORCE_COLOR")
        .env_remove("VITRINE_FORCE_REBUILD")
        .env_remove("VITRINE_OUT_DIR");
    cmd
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[test]
fn test_help_lists_commands() {
    vitrine()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("entries"))
        .stdout(predicate::str::contains("pack"))
        .stdout(predicate::str::contains("inspect"));
}

#[test]
fn test_missing_config_fails() {
    let temp = TempDir::new().unwrap();
    vitrine()
        .args(["build", "--root"])
        .arg(temp.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no vitrine config found"));
}

#[test]
fn test_entries_expands_globs() {
    let temp = TempDir::new().unwrap();
    write(&temp.path().join("pages/home.html"), "");
    write(&temp.path().join("pages/about.html"), "");
    write(&temp.path().join("script.js"), "");
    write(
        &temp.path().join("vitrine.toml"),
        r#"entries = ["./script.js", "pages/*.html"]"#,
    );

    let output = vitrine()
        .args(["entries", "--json", "--root"])
        .arg(temp.path())
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let entries: Vec<String> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(entries, vec!["script.js", "pages/about.html", "pages/home.html"]);
}

#[test]
fn test_entries_reads_package_json() {
    let temp = TempDir::new().unwrap();
    write(&temp.path().join("src/main.ts"), "");
    write(
        &temp.path().join("package.json"),
        r#"{"name": "web", "vitrine": {"entries": ["src/main.ts"]}}"#,
    );

    vitrine()
        .args(["entries", "--root"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout("src/main.ts\n");
}

#[test]
fn test_empty_entry_set_is_rejected() {
    let temp = TempDir::new().unwrap();
    write(&temp.path().join("vitrine.toml"), "entries = []");

    vitrine()
        .args(["entries", "--config"])
        .arg(temp.path().join("vitrine.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("no entries specified"));
}

#[test]
fn test_inspect_rejects_foreign_file() {
    let temp = TempDir::new().unwrap();
    let bogus = temp.path().join("assets.vitrine");
    write(&bogus, "definitely not a pack");

    vitrine()
        .arg("inspect")
        .arg(&bogus)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a vitrine asset pack"));
}

#[cfg(unix)]
#[test]
fn test_pack_then_inspect() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("web");
    write(&root.join("main.js"), "console.log('main');");
    write(
        &root.join("vitrine.toml"),
        r#"
entries = ["main.js"]

[aliases]
app = "main.js"

[bundler]
command = ["sh", "-c", '''
mkdir -p "$VITRINE_OUT_DIR/.vite" "$VITRINE_OUT_DIR/assets"
cp main.js "$VITRINE_OUT_DIR/assets/main-1a2b3c.js"
printf '{"main.js": {"file": "assets/main-1a2b3c.js", "isEntry": true}}' > "$VITRINE_OUT_DIR/.vite/manifest.json"
''']
"#,
    );
    let pack = temp.path().join("out/assets.vitrine");

    let output = vitrine()
        .args(["pack", "--root"])
        .arg(&root)
        .arg("--out")
        .arg(&pack)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let digest = String::from_utf8(output.stdout).unwrap();
    assert_eq!(digest.trim().len(), 64);
    assert!(pack.is_file());

    // Nothing changed, so the second pack comes from the cache
    vitrine()
        .args(["pack", "--root"])
        .arg(&root)
        .arg("--out")
        .arg(&pack)
        .assert()
        .success()
        .stdout(digest.clone())
        .stderr(predicate::str::contains("Frontend unchanged"));

    let output = vitrine()
        .arg("inspect")
        .arg(&pack)
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let listing: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names = listing["names"].as_array().unwrap();
    assert!(names.iter().any(|name| {
        name["name"] == "app"
            && name["alias_of"] == "main.js"
            && name["file"] == "assets/main-1a2b3c.js"
    }));
    let assets = listing["assets"].as_array().unwrap();
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0]["path"], "assets/main-1a2b3c.js");
    assert_eq!(assets[0]["content_type"], "text/javascript; charset=utf-8");
}
