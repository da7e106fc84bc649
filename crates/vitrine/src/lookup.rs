//! Entry-name lookup over an [`AssetStore`].

use crate::content_type;
use crate::manifest::{AssetRecord, OutputPath};
use crate::store::{AssetStore, EmbeddedAsset};

/// An entry resolved to its built files. Borrows from the store; never copies bytes.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedAsset<'a> {
    name: &'a str,
    input: &'a str,
    record: &'a AssetRecord,
    primary: &'a EmbeddedAsset,
}

impl AssetStore {
    /// Resolve an input path (`app/index.html`) or alias (`bundle`).
    ///
    /// Matching is exact and case-sensitive. `None` means the name is unknown,
    /// which callers typically turn into a 404.
    pub fn resolve<'a>(&'a self, name: &'a str) -> Option<ResolvedAsset<'a>> {
        let input = self.manifest.input_key(name)?;
        let record = self.manifest.get(input)?;
        let primary = self.assets.get(record.file().logical())?;
        Some(ResolvedAsset {
            name,
            input,
            record,
            primary,
        })
    }
}

impl<'a> ResolvedAsset<'a> {
    /// The name this was looked up by.
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// The input path the name refers to (differs from `name` for aliases).
    pub fn input(&self) -> &'a str {
        self.input
    }

    pub fn is_alias(&self) -> bool {
        self.name != self.input
    }

    pub fn record(&self) -> &'a AssetRecord {
        self.record
    }

    pub fn asset(&self) -> &'a EmbeddedAsset {
        self.primary
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.primary.bytes()
    }

    pub fn content_type(&self) -> &'static str {
        self.primary.content_type()
    }

    /// Hashed logical path of the primary file.
    pub fn file(&self) -> &'a str {
        self.primary.path()
    }

    pub fn css_files(&self) -> Vec<&'a str> {
        logical(self.record.css())
    }

    pub fn import_files(&self) -> Vec<&'a str> {
        logical(self.record.imports())
    }

    pub fn dynamic_import_files(&self) -> Vec<&'a str> {
        logical(self.record.dynamic_imports())
    }

    /// `<link rel="stylesheet">` tags for the entry's CSS, under `base`.
    pub fn stylesheets(&self, base: &str) -> Vec<String> {
        self.record
            .css()
            .iter()
            .map(|css| {
                format!(
                    r#"<link rel="stylesheet" href="{}">"#,
                    escape_attr(&url(base, css.logical()))
                )
            })
            .collect()
    }

    /// `<link rel="modulepreload">` tags for the entry's static imports, under `base`.
    pub fn preloads(&self, base: &str) -> Vec<String> {
        self.record
            .imports()
            .iter()
            .filter(|import| content_type::is_javascript(content_type::from_path(import.logical())))
            .map(|import| {
                format!(
                    r#"<link rel="modulepreload" href="{}">"#,
                    escape_attr(&url(base, import.logical()))
                )
            })
            .collect()
    }

    /// All tags needed to load the entry from an HTML page: stylesheets,
    /// preloads, then the entry script (or stylesheet, for CSS entries).
    pub fn html_tags(&self, base: &str) -> String {
        let mut tags = self.stylesheets(base);
        tags.extend(self.preloads(base));

        let href = escape_attr(&url(base, self.file()));
        if content_type::is_javascript(self.content_type()) {
            tags.push(format!(r#"<script type="module" src="{}"></script>"#, href));
        } else if content_type::is_stylesheet(self.content_type()) {
            tags.push(format!(r#"<link rel="stylesheet" href="{}">"#, href));
        }
        tags.join("\n")
    }
}

fn logical(paths: &[OutputPath]) -> Vec<&str> {
    paths.iter().map(OutputPath::logical).collect()
}

fn url(base: &str, logical: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), logical)
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}
