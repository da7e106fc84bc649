//! Command implementations for the vitrine CLI.
//!
//! Each command lives in its own module and exposes an `execute` function
//! taking its parsed arguments.

pub mod build;
pub mod entries;
pub mod inspect;
pub mod pack;

pub use build::execute as build_execute;
pub use entries::execute as entries_execute;
pub use inspect::execute as inspect_execute;
pub use pack::execute as pack_execute;

use vitrine::ProjectConfig;
use vitrine_config::ConfigDiscovery;

use crate::cli::ProjectArgs;
use crate::error::Result;

/// Load the project config named by `--config`, or discover it under `--root`.
///
/// The returned config has an absolute root.
pub(crate) fn load_project(args: &ProjectArgs) -> Result<ProjectConfig> {
    let config = match &args.config {
        Some(path) => ProjectConfig::load(path)?,
        None => ConfigDiscovery::new(&args.root).load()?,
    };
    let config = config.into_absolute()?;
    tracing::debug!(root = %config.root.display(), "resolved project root");
    Ok(config)
}
