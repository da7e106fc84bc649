//! Error types for configuration validation and loading.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    // Config parsing/loading errors
    #[error("no vitrine config found in {0}")]
    NotFound(PathBuf),

    #[error("invalid config value for `{field}`: {message}")]
    InvalidValue { field: String, message: String },

    // Schema validation errors
    #[error("no entries specified")]
    NoEntries,

    #[error("project root not found or not a directory: {0}")]
    RootNotFound(PathBuf),

    #[error("output directory {out_dir} must be within the project root {root}")]
    OutputOutsideRoot { out_dir: PathBuf, root: PathBuf },

    #[error("invalid alias `{alias}`: {reason}")]
    InvalidAlias { alias: String, reason: String },

    // Entry expansion errors
    #[error("invalid entry pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("entry pattern `{0}` matched no files")]
    EmptyExpansion(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl std::fmt::Display) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            message: message.to_string(),
        }
    }
}
