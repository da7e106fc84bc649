//! `vitrine pack`

use std::fs;

use vitrine::pack::pack_digest;

use crate::cli::PackArgs;
use crate::commands::build::build_store;
use crate::commands::load_project;
use crate::error::{CliError, Result, ResultExt};
use crate::ui;

pub fn execute(args: PackArgs) -> Result<()> {
    if args.out.is_dir() {
        return Err(CliError::InvalidArgument(format!(
            "--out must name a file, but {} is a directory",
            args.out.display()
        )));
    }

    let mut config = load_project(&args.project)?;
    if args.force {
        config.cache.force_rebuild = true;
    }

    let (outcome, store) = build_store(&config)?;
    if outcome.cache_hit {
        ui::info("Frontend unchanged, packing the cached build");
    }

    let pack = store.pack()?;
    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_action("create", parent)?;
    }
    fs::write(&args.out, &pack).with_action("write", &args.out)?;

    ui::success(&format!(
        "Wrote {} ({} files, {})",
        args.out.display(),
        store.len(),
        ui::format_size(pack.len() as u64)
    ));
    println!("{}", pack_digest(&pack));
    Ok(())
}
