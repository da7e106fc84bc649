//! vitrine CLI entry point: argument parsing, logging setup and command dispatch.

use clap::Parser;
use miette::Result;
use vitrine_cli::{cli, commands, error, logger, ui};

fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    let result = match args.command {
        cli::Command::Build(build_args) => commands::build_execute(build_args),
        cli::Command::Entries(entries_args) => commands::entries_execute(entries_args),
        cli::Command::Pack(pack_args) => commands::pack_execute(pack_args),
        cli::Command::Inspect(inspect_args) => commands::inspect_execute(inspect_args),
    };

    result.map_err(error::cli_error_to_miette)
}
