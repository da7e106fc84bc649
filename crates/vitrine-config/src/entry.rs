//! Entry inputs as declared in the project descriptor.

use std::fmt;

/// A single declared entry point.
///
/// Entries containing glob metacharacters (`*`, `?`, `[`) are patterns that get
/// expanded against the project root right before the bundler runs. Everything
/// else is a literal, root-relative input path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryInput {
    Literal(String),
    Pattern(String),
}

impl EntryInput {
    pub fn parse(raw: &str) -> Self {
        let normalized = normalize_entry_path(raw);
        if is_glob(&normalized) {
            EntryInput::Pattern(normalized)
        } else {
            EntryInput::Literal(normalized)
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EntryInput::Literal(s) | EntryInput::Pattern(s) => s,
        }
    }

    pub fn is_pattern(&self) -> bool {
        matches!(self, EntryInput::Pattern(_))
    }
}

impl fmt::Display for EntryInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize a root-relative input path to the form bundler manifests use as keys.
///
/// Backslashes become `/`, leading `./` segments are dropped and repeated
/// separators collapse. `./script.js` and `script.js` name the same input.
pub fn normalize_entry_path(raw: &str) -> String {
    let unified = raw.trim().replace('\\', "/");
    let mut rest = unified.as_str();
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped.trim_start_matches('/');
    }

    rest.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

fn is_glob(path: &str) -> bool {
    path.contains(['*', '?', '['])
}
