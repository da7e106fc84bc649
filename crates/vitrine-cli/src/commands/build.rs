//! `vitrine build`

use std::time::Instant;

use vitrine::{AssetStore, BuildCache, BuildOutcome, Orchestrator, ProcessBundler, ProjectConfig};

use crate::cli::BuildArgs;
use crate::commands::load_project;
use crate::error::Result;
use crate::ui;

/// Execute the build command.
///
/// # Build Process
///
/// 1. Load and validate configuration (env > descriptor > defaults)
/// 2. Build, or reuse the cached build when nothing changed
/// 3. Read back the output directory and print a summary
pub fn execute(args: BuildArgs) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_project(&args.project)?;
    if args.force {
        config.cache.force_rebuild = true;
    }
    if args.no_cache {
        config.cache.enabled = false;
    }

    let (outcome, store) = build_store(&config)?;

    if outcome.cache_hit {
        ui::success(&format!(
            "Frontend unchanged, reused build {}",
            &outcome.fingerprint.hex()[..12]
        ));
    } else {
        ui::success(&format!(
            "Built {} entries in {}",
            outcome.entries.len(),
            ui::format_duration(start_time.elapsed())
        ));
    }
    print_summary(&store);
    Ok(())
}

/// Run the orchestrator for `config` and embed the result.
pub(crate) fn build_store(config: &ProjectConfig) -> Result<(BuildOutcome, AssetStore)> {
    let mut cache = BuildCache::open(config)?;
    let outcome = Orchestrator::new(ProcessBundler::new()).build(config, &mut cache)?;
    let store = AssetStore::new(outcome.manifest.clone())?;
    Ok((outcome, store))
}

fn print_summary(store: &AssetStore) {
    for name in store.names() {
        let Some(resolved) = store.resolve(name) else {
            continue;
        };
        let target = if resolved.is_alias() {
            format!("{} (alias of {})", resolved.file(), resolved.input())
        } else {
            resolved.file().to_string()
        };
        eprintln!(
            "  {:<32} {} {}",
            name,
            target,
            console::style(ui::format_size(resolved.bytes().len() as u64)).dim()
        );
    }

    let total: u64 = store.iter().map(|asset| asset.len() as u64).sum();
    ui::info(&format!(
        "{} files embedded ({})",
        store.len(),
        ui::format_size(total)
    ));
}
