//! Command-line interface definition for vitrine.
//!
//! # Command Structure
//!
//! - `vitrine build` - Run the bundler unless the cached build is still valid
//! - `vitrine entries` - Print the expanded entry set
//! - `vitrine pack` - Build and write an embeddable asset pack
//! - `vitrine inspect` - List the contents of an asset pack

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// vitrine - build a frontend and embed it in a Rust binary
#[derive(Parser, Debug)]
#[command(
    name = "vitrine",
    version,
    about = "Build a frontend with its bundler and embed the output",
    long_about = "vitrine drives a frontend bundler (Vite by default), skips the build when\n\
                  nothing under the project root changed, and packs the output so a Rust\n\
                  binary can serve it without touching the filesystem."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    ///
    /// Shows cache decisions and the bundler's own output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the frontend project
    ///
    /// The bundler only runs when the source fingerprint, the entry set or the
    /// output files differ from the last successful build.
    Build(BuildArgs),

    /// Print the entry set after glob expansion
    Entries(EntriesArgs),

    /// Build, then write the output as a single asset pack
    ///
    /// Embed the pack with `include_bytes!` and read it with
    /// `vitrine::AssetStore::unpack`.
    Pack(PackArgs),

    /// List the assets and entry names inside an asset pack
    Inspect(InspectArgs),
}

/// Where to find the project.
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Project directory searched for vitrine.toml or package.json
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Explicit config file (vitrine.toml or package.json); overrides --root discovery
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Run the bundler even if the cached build is still valid
    #[arg(short, long)]
    pub force: bool,

    /// Neither read nor write the build cache
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct EntriesArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Print a JSON array instead of one entry per line
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PackArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Pack file to write
    #[arg(short, long, value_name = "FILE")]
    pub out: PathBuf,

    /// Run the bundler even if the cached build is still valid
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Pack file to read
    #[arg(value_name = "PACK")]
    pub pack: PathBuf,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_build_flags() {
        let cli = Cli::parse_from(["vitrine", "build", "--root", "web", "--force", "-v"]);
        assert!(cli.verbose);
        match cli.command {
            Command::Build(args) => {
                assert_eq!(args.project.root, PathBuf::from("web"));
                assert!(args.force);
                assert!(!args.no_cache);
            }
            other => panic!("expected build, got {other:?}"),
        }
    }

    #[test]
    fn test_pack_requires_out() {
        assert!(Cli::try_parse_from(["vitrine", "pack"]).is_err());
        let cli = Cli::parse_from(["vitrine", "pack", "-o", "assets.vitrine"]);
        assert!(matches!(cli.command, Command::Pack(ref args) if args.out == PathBuf::from("assets.vitrine")));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["vitrine", "-v", "-q", "entries"]).is_err());
    }
}
