pub mod discovery;
pub mod entry;
pub mod error;
mod loading;
pub mod project;

// Re-export main types
pub use entry::*;
pub use error::*;
pub use project::*;

pub use discovery::{discover, ConfigDiscovery, CONFIG_FILE_NAME};
