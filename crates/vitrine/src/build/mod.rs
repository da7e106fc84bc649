//! Build orchestration.
//!
//! The [`Orchestrator`] gates the external bundler on the source fingerprint:
//!
//! 1. Expand the declared entries (globs are resolved against the project root)
//! 2. Fingerprint the project root
//! 3. Reuse the cached manifest if fingerprint, entry set and output files all still match
//! 4. Otherwise run the [`Bundler`], parse its manifest and update the cache
//!
//! The bundler is injected, so the cache logic can be exercised without Node.

mod bundler;
pub mod entries;
mod orchestrator;

pub use bundler::{
    Bundler, BundlerInvocation, BundlerOutput, ENTRIES_ENV, OUT_DIR_ENV, PUBLIC_DIR_ENV,
    PackageManager, ProcessBundler,
};
pub use entries::expand_entries;
pub use orchestrator::{BuildOutcome, Orchestrator};
