//! Entry expansion: declared entries (literals and globs) to concrete input paths.

use std::path::Path;

use glob::{MatchOptions, Pattern};
use path_clean::PathClean;
use vitrine_config::{ConfigError, EntryInput};

use crate::fingerprint::relative_key;
use crate::{Error, ProjectConfig, Result};

/// Directory names a glob never descends into.
const SKIPPED_DIRS: &[&str] = &["node_modules", ".git"];

/// Expand the config's entries against its root.
///
/// Literals pass through in normalized form. Patterns expand to the matching
/// files, sorted. The result keeps declaration order and drops duplicates.
///
/// # Errors
///
/// - [`ConfigError::NoEntries`] if nothing is declared
/// - [`ConfigError::InvalidPattern`] for a malformed glob
/// - [`ConfigError::EmptyExpansion`] if a glob matches no file
pub fn expand_entries(config: &ProjectConfig) -> Result<Vec<String>> {
    let inputs = config.entry_inputs();
    if inputs.is_empty() {
        return Err(ConfigError::NoEntries.into());
    }

    let root = config.root.clean();
    let out_dir = config.absolute_out_dir();
    let mut expanded: Vec<String> = Vec::new();

    for input in &inputs {
        let matches = match input {
            EntryInput::Literal(path) => vec![path.clone()],
            EntryInput::Pattern(pattern) => expand_pattern(&root, &out_dir, pattern)?,
        };
        for entry in matches {
            if !expanded.contains(&entry) {
                expanded.push(entry);
            }
        }
    }

    tracing::debug!(entries = ?expanded, "expanded entries");
    Ok(expanded)
}

fn expand_pattern(root: &Path, out_dir: &Path, pattern: &str) -> Result<Vec<String>> {
    let invalid = |message: String| -> Error {
        ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            message,
        }
        .into()
    };

    // Validate the user's part on its own so errors point at it, not at the escaped root.
    Pattern::new(pattern).map_err(|e| invalid(e.to_string()))?;

    let root_prefix = Pattern::escape(&root.to_string_lossy());
    let full = format!("{}/{}", root_prefix.trim_end_matches('/'), pattern);
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };

    let mut matches = Vec::new();
    for path in glob::glob_with(&full, options).map_err(|e| invalid(e.to_string()))? {
        let path = path.map_err(|e| {
            let path = e.path().to_path_buf();
            Error::fs(path, std::io::Error::from(e))
        })?;
        if !path.is_file() || path.starts_with(out_dir) {
            continue;
        }
        let Some(relative) = relative_key(root, &path) else {
            continue;
        };
        if relative.split('/').any(|segment| SKIPPED_DIRS.contains(&segment)) {
            continue;
        }
        matches.push(relative);
    }

    if matches.is_empty() {
        return Err(ConfigError::EmptyExpansion(pattern.to_string()).into());
    }
    matches.sort();
    Ok(matches)
}
