//! Error handling for the vitrine CLI.
//!
//! Library errors already carry diagnostics; the CLI adds the few failures
//! that only exist at the command line (writing output files, bad arguments).

use std::path::PathBuf;

use miette::Report;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// Build, cache, manifest or pack failures from the library
    #[error(transparent)]
    Vitrine(#[from] vitrine::Error),

    /// Config discovery or validation failures
    #[error(transparent)]
    Config(#[from] vitrine_config::ConfigError),

    #[error("Failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Attach a path and an action to I/O results.
pub trait ResultExt<T> {
    fn with_action(self, action: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_action(self, action: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| CliError::Io {
            action,
            path: path.into(),
            source,
        })
    }
}

/// Convert a CLI error into a miette report, keeping library diagnostics.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Vitrine(e) => Report::new(e),
        CliError::Config(e) => Report::new(vitrine::Error::Config(e)),
        CliError::InvalidArgument(message) => {
            miette::miette!(help = "Run `vitrine --help` for usage", "{}", message)
        }
        other => miette::miette!("{}", other),
    }
}
