//! Logging setup for the vitrine CLI.
//!
//! The level is chosen in this order:
//! 1. `--verbose`: DEBUG for the vitrine crates
//! 2. `--quiet`: ERROR only
//! 3. `VITRINE_LOG`, then `RUST_LOG`
//! 4. INFO for the vitrine crates
//!
//! Logs go to stderr; stdout is kept for command output such as `entries --json`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const VERBOSE_FILTER: &str = "vitrine=debug,vitrine_config=debug,vitrine_cli=debug";
const QUIET_FILTER: &str = "vitrine=error,vitrine_config=error,vitrine_cli=error";
const DEFAULT_FILTER: &str = "vitrine=info,vitrine_config=info,vitrine_cli=info";

/// Build the filter for the given flags.
pub fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_env("VITRINE_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Install the global subscriber. Call once, before any logging.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && should_use_colors())
        .with_writer(std::io::stderr)
        .without_time()
        .compact();

    tracing_subscriber::registry()
        .with(filter_for(verbose, quiet))
        .with(fmt_layer)
        .init();
}

/// Check if colored output should be enabled.
///
/// `NO_COLOR` disables colors, `FORCE_COLOR` forces them, otherwise the
/// terminal decides.
pub fn should_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::Term::stderr().features().colors_supported()
}
