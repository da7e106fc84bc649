//! vitrine CLI - build, pack and inspect embedded frontend assets.
//!
//! - [`cli`] - clap argument definitions
//! - [`commands`] - one module per subcommand
//! - [`error`] - CLI errors and their miette conversion
//! - [`logger`] - tracing subscriber setup
//! - [`ui`] - status lines and formatting

pub mod cli;
pub mod commands;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, Result, ResultExt};
