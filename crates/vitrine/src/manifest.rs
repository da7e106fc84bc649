//! The bundler manifest: input path to hashed output files.
//!
//! A Vite manifest is a JSON object keyed by input path (`app/index.html`,
//! `script.js`, or `_chunk-HASH.js` for shared chunks). Each value names the
//! hashed output `file` and optionally the `css`, `imports` and
//! `dynamicImports` that go with it. Every output path is resolved against the
//! build's output directory as soon as the manifest is parsed.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vitrine_config::{ConfigError, normalize_entry_path};

use crate::fingerprint::relative_key;
use crate::{Error, Result};

/// Renamed bundles: alias name to input path.
pub type AliasTable = BTreeMap<String, String>;

/// An output file, in logical (output-dir-relative, `/`-separated) and absolute form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputPath {
    logical: String,
    absolute: PathBuf,
}

impl OutputPath {
    /// Resolve a bundler-relative output path against `output_dir`.
    ///
    /// Absolute paths and paths with `..` components are rejected.
    pub fn resolve(output_dir: &Path, raw: &str) -> Result<Self> {
        let unified = raw.replace('\\', "/");
        if unified.starts_with('/') || Path::new(raw).is_absolute() || has_prefix(raw) {
            return Err(Error::ManifestFormat(format!(
                "output path `{}` is absolute",
                raw
            )));
        }

        let mut segments = Vec::new();
        for segment in unified.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    return Err(Error::ManifestFormat(format!(
                        "output path `{}` escapes the output directory",
                        raw
                    )));
                }
                other => segments.push(other),
            }
        }
        if segments.is_empty() {
            return Err(Error::ManifestFormat("empty output path".to_string()));
        }

        let mut absolute = output_dir.to_path_buf();
        for segment in &segments {
            absolute.push(segment);
        }

        Ok(Self {
            logical: segments.join("/"),
            absolute,
        })
    }

    pub fn logical(&self) -> &str {
        &self.logical
    }

    pub fn absolute(&self) -> &Path {
        &self.absolute
    }

    /// Last path segment, e.g. `index-abc123.js`.
    pub fn file_name(&self) -> &str {
        self.logical.rsplit('/').next().unwrap_or(&self.logical)
    }
}

fn has_prefix(raw: &str) -> bool {
    matches!(Path::new(raw).components().next(), Some(Component::Prefix(_)))
        || raw.as_bytes().get(1) == Some(&b':')
}

/// What the bundler produced for one input path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    file: OutputPath,
    css: Vec<OutputPath>,
    imports: Vec<OutputPath>,
    dynamic_imports: Vec<OutputPath>,
    src: Option<String>,
    name: Option<String>,
    is_entry: bool,
    is_dynamic_entry: bool,
}

impl AssetRecord {
    /// The primary hashed output file.
    pub fn file(&self) -> &OutputPath {
        &self.file
    }

    pub fn css(&self) -> &[OutputPath] {
        &self.css
    }

    pub fn imports(&self) -> &[OutputPath] {
        &self.imports
    }

    pub fn dynamic_imports(&self) -> &[OutputPath] {
        &self.dynamic_imports
    }

    pub fn src(&self) -> Option<&str> {
        self.src.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_entry(&self) -> bool {
        self.is_entry
    }

    pub fn is_dynamic_entry(&self) -> bool {
        self.is_dynamic_entry
    }

    /// Every output path this record references, primary file first.
    pub fn output_paths(&self) -> impl Iterator<Item = &OutputPath> {
        std::iter::once(&self.file)
            .chain(&self.css)
            .chain(&self.imports)
            .chain(&self.dynamic_imports)
    }
}

/// One manifest value as the bundler writes it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawChunk {
    file: String,
    #[serde(default)]
    css: Vec<String>,
    #[serde(default)]
    imports: Vec<String>,
    #[serde(default)]
    dynamic_imports: Vec<String>,
    #[serde(default)]
    src: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    is_entry: bool,
    #[serde(default)]
    is_dynamic_entry: bool,
}

/// Parsed manifest, bound to the output directory it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    output_dir: PathBuf,
    source: Option<String>,
    records: BTreeMap<String, AssetRecord>,
    aliases: AliasTable,
}

impl Manifest {
    /// Parse manifest JSON and resolve its output paths against `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ManifestFormat`] if the document is not a JSON object,
    /// an entry lacks `file`, a field has the wrong type, or an output path
    /// escapes `output_dir`.
    pub fn parse(bytes: &[u8], output_dir: &Path) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| Error::ManifestFormat(format!("not valid JSON: {}", e)))?;

        let Value::Object(map) = value else {
            return Err(Error::ManifestFormat(
                "manifest must be a JSON object keyed by input path".to_string(),
            ));
        };

        let mut raw = BTreeMap::new();
        for (key, chunk) in map {
            if !chunk.is_object() {
                return Err(Error::ManifestFormat(format!(
                    "entry `{}` must be an object",
                    key
                )));
            }
            let chunk: RawChunk = serde_json::from_value(chunk)
                .map_err(|e| Error::ManifestFormat(format!("entry `{}`: {}", key, e)))?;
            raw.insert(key, chunk);
        }

        let mut records = BTreeMap::new();
        for (key, chunk) in &raw {
            let record = build_record(output_dir, key, chunk, &raw)?;
            records.insert(key.clone(), record);
        }

        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            source: None,
            records,
            aliases: AliasTable::new(),
        })
    }

    /// Read and parse the manifest file at `path`.
    pub fn read_from(path: &Path, output_dir: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| Error::fs(path, e))?;
        let mut manifest = Self::parse(&bytes, output_dir)?;
        manifest.source = relative_key(output_dir, path);
        Ok(manifest)
    }

    /// Attach renamed bundles. Each alias points at an existing input path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAlias`] if a target is not a manifest key
    /// or an alias would shadow one.
    pub fn with_aliases(mut self, aliases: &AliasTable) -> Result<Self> {
        for (alias, target) in aliases {
            let target = normalize_entry_path(target);
            if self.records.contains_key(alias) {
                return Err(ConfigError::InvalidAlias {
                    alias: alias.clone(),
                    reason: "shadows an input path of the same name".to_string(),
                }
                .into());
            }
            if !self.records.contains_key(&target) {
                return Err(ConfigError::InvalidAlias {
                    alias: alias.clone(),
                    reason: format!("target `{}` is not an entry of the manifest", target),
                }
                .into());
            }
            self.aliases.insert(alias.clone(), target);
        }
        Ok(self)
    }

    /// Look up an input path or alias. Exact, case-sensitive match.
    pub fn get(&self, name: &str) -> Option<&AssetRecord> {
        self.input_key(name).and_then(|key| self.records.get(key))
    }

    /// The input path `name` refers to: itself, or an alias target.
    pub fn input_key<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.records.contains_key(name) {
            Some(name)
        } else {
            self.aliases.get(name).map(String::as_str)
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &AssetRecord)> {
        self.records.iter().map(|(key, record)| (key.as_str(), record))
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Entry names and aliases, sorted.
    ///
    /// Only records the bundler marked `isEntry` count as entries, so shared
    /// chunks (`_chunk-HASH.js`) and imported assets are left out. [`Self::get`]
    /// still resolves them.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .records
            .iter()
            .filter(|(_, record)| record.is_entry)
            .map(|(key, _)| key)
            .chain(self.aliases.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Logical path of the manifest file itself, when read from inside the output directory.
    pub fn source_file(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Every output path referenced by any record, deduplicated, sorted by logical path.
    pub fn output_files(&self) -> Vec<&OutputPath> {
        let unique: BTreeMap<&str, &OutputPath> = self
            .records
            .values()
            .flat_map(AssetRecord::output_paths)
            .map(|path| (path.logical(), path))
            .collect();
        unique.into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Output-dir-independent form, for the build cache and packed bundles.
    pub fn snapshot(&self) -> ManifestSnapshot {
        let entries = self
            .records
            .iter()
            .map(|(key, record)| {
                let logical = |paths: &[OutputPath]| -> Vec<String> {
                    paths.iter().map(|p| p.logical.clone()).collect()
                };
                let snapshot = RecordSnapshot {
                    file: record.file.logical.clone(),
                    css: logical(&record.css),
                    imports: logical(&record.imports),
                    dynamic_imports: logical(&record.dynamic_imports),
                    src: record.src.clone(),
                    name: record.name.clone(),
                    is_entry: record.is_entry,
                    is_dynamic_entry: record.is_dynamic_entry,
                };
                (key.clone(), snapshot)
            })
            .collect();

        ManifestSnapshot {
            source: self.source.clone(),
            entries,
            aliases: self.aliases.clone(),
        }
    }

    /// Re-resolve a snapshot against `output_dir`.
    pub fn from_snapshot(snapshot: &ManifestSnapshot, output_dir: &Path) -> Result<Self> {
        let resolve_all = |paths: &[String]| -> Result<Vec<OutputPath>> {
            paths
                .iter()
                .map(|p| OutputPath::resolve(output_dir, p))
                .collect()
        };

        let mut records = BTreeMap::new();
        for (key, record) in &snapshot.entries {
            records.insert(
                key.clone(),
                AssetRecord {
                    file: OutputPath::resolve(output_dir, &record.file)?,
                    css: resolve_all(&record.css)?,
                    imports: resolve_all(&record.imports)?,
                    dynamic_imports: resolve_all(&record.dynamic_imports)?,
                    src: record.src.clone(),
                    name: record.name.clone(),
                    is_entry: record.is_entry,
                    is_dynamic_entry: record.is_dynamic_entry,
                },
            );
        }

        for (alias, target) in &snapshot.aliases {
            if !records.contains_key(target) {
                return Err(Error::ManifestFormat(format!(
                    "alias `{}` points at unknown entry `{}`",
                    alias, target
                )));
            }
        }

        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            source: snapshot.source.clone(),
            records,
            aliases: snapshot.aliases.clone(),
        })
    }
}

fn build_record(
    output_dir: &Path,
    key: &str,
    chunk: &RawChunk,
    all: &BTreeMap<String, RawChunk>,
) -> Result<AssetRecord> {
    let in_entry = |err: Error| match err {
        Error::ManifestFormat(message) => {
            Error::ManifestFormat(format!("entry `{}`: {}", key, message))
        }
        other => other,
    };

    // `imports` may name other manifest keys (`_chunk-HASH.js`); those resolve to that key's file.
    let chunk_file = |reference: &str| -> Result<OutputPath> {
        let file = all.get(reference).map_or(reference, |target| target.file.as_str());
        OutputPath::resolve(output_dir, file).map_err(in_entry)
    };

    Ok(AssetRecord {
        file: OutputPath::resolve(output_dir, &chunk.file).map_err(in_entry)?,
        css: chunk
            .css
            .iter()
            .map(|css| OutputPath::resolve(output_dir, css).map_err(in_entry))
            .collect::<Result<_>>()?,
        imports: chunk
            .imports
            .iter()
            .map(|import| chunk_file(import))
            .collect::<Result<_>>()?,
        dynamic_imports: chunk
            .dynamic_imports
            .iter()
            .map(|import| chunk_file(import))
            .collect::<Result<_>>()?,
        src: chunk.src.clone(),
        name: chunk.name.clone(),
        is_entry: chunk.is_entry,
        is_dynamic_entry: chunk.is_dynamic_entry,
    })
}

/// [`Manifest`] in logical form.
///
/// Fields are never skipped when serializing: packs encode this with
/// positional `bincode`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ManifestSnapshot {
    #[serde(default)]
    pub source: Option<String>,
    pub entries: BTreeMap<String, RecordSnapshot>,
    #[serde(default)]
    pub aliases: AliasTable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub file: String,
    #[serde(default)]
    pub css: Vec<String>,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub dynamic_imports: Vec<String>,
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_entry: bool,
    #[serde(default)]
    pub is_dynamic_entry: bool,
}
